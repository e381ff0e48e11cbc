//! Text tables for a format catalog

use std::fmt;

use crate::catalog::Catalog;

const PROGRESSIVE_RULE: &str = "----------------------------------------------";
const ADAPTIVE_RULE: &str =
    "-------------------------------------------------------------------------";

/// Both catalog tables, numbered 1.. across progressive then adaptive.
pub struct CatalogTable<'a>(pub &'a Catalog);

impl fmt::Display for CatalogTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let catalog = self.0;

        writeln!(f, "{}", PROGRESSIVE_RULE)?;
        writeln!(f, " # :  ID :        TYPE  : QUALITY : DIMENSIONS")?;
        writeln!(f, "{}", PROGRESSIVE_RULE)?;
        for (i, format) in catalog.progressive().iter().enumerate() {
            writeln!(
                f,
                "{:>2} : {:>3} : {:>12} : {:>7} : {}",
                i + 1,
                format.id,
                format.media_type,
                format.quality.as_deref().unwrap_or("unknown"),
                format.resolution.as_deref().unwrap_or("unknown"),
            )?;
        }
        writeln!(f)?;

        let offset = catalog.progressive().len();
        writeln!(f, "{}", ADAPTIVE_RULE)?;
        writeln!(f, " # :  ID :        TYPE  :      SIZE : FPS :  BITRATE :     INDEX :   INIT")?;
        writeln!(f, "{}", ADAPTIVE_RULE)?;
        for (i, format) in catalog.adaptive().iter().enumerate() {
            let field = |name: &str| format.extra(name).unwrap_or("-");
            writeln!(
                f,
                "{:>2} : {:>3} : {:>12} : {:>9} : {:>3} : {:>8} : {:>9} : {:>6}",
                offset + i + 1,
                format.id,
                format.media_type,
                field("size"),
                field("fps"),
                field("bitrate"),
                field("index"),
                field("init"),
            )?;
        }
        writeln!(f)
    }
}

pub fn render_catalog(catalog: &Catalog) -> String {
    CatalogTable(catalog).to_string()
}
