use std::{fmt, sync::LazyLock};

use anyhow::{anyhow, bail, Context, Result};
use geo::{Coord, MapCoords, MultiPolygon};
use proj4rs::{proj::Proj as Proj4, transform::transform};
use regex::Regex;

/// EPSG codes this crate can name without an explicit PROJ.4 string.
const KNOWN_EPSG: &[(u32, &str, &str)] = &[
    (4326,  "WGS 84",          "+proj=longlat +datum=WGS84 +no_defs +type=crs"),
    (4490,  "CGCS2000",        "+proj=longlat +ellps=GRS80 +no_defs +type=crs"),
    (4214,  "Beijing 1954",    "+proj=longlat +ellps=krass +towgs84=15.8,-154.4,-82.3,0,0,0,0 +no_defs +type=crs"),
    (4610,  "Xian 1980",       "+proj=longlat +a=6378140 +b=6356755.288157528 +no_defs +type=crs"),
    (3857,  "WGS 84 / Pseudo-Mercator",
        "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +nadgrids=@null +wktext +no_defs +type=crs"),
    (32648, "WGS 84 / UTM zone 48N", "+proj=utm +zone=48 +datum=WGS84 +units=m +no_defs +type=crs"),
    (32649, "WGS 84 / UTM zone 49N", "+proj=utm +zone=49 +datum=WGS84 +units=m +no_defs +type=crs"),
    (32650, "WGS 84 / UTM zone 50N", "+proj=utm +zone=50 +datum=WGS84 +units=m +no_defs +type=crs"),
    (32651, "WGS 84 / UTM zone 51N", "+proj=utm +zone=51 +datum=WGS84 +units=m +no_defs +type=crs"),
];

static EPSG_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)EPSG:(?:[\d.]*:)?(\d+)$").expect("valid regex")
});

static WKT_AUTHORITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"AUTHORITY\[\s*"EPSG"\s*,\s*"(\d+)"\s*\]\s*\]\s*$"#).expect("valid regex")
});

/// A coordinate reference system, carried as a PROJ.4 definition.
#[derive(Debug, Clone)]
pub struct Crs {
    label: String,
    proj4: String,
    geographic: bool,
}

impl Crs {
    /// WGS 84 longitude/latitude (EPSG:4326).
    pub fn wgs84() -> Self {
        Self::from_epsg(4326).expect("EPSG:4326 is always known")
    }

    /// Look up one of the known EPSG codes.
    pub fn from_epsg(code: u32) -> Result<Self> {
        let &(code, _, proj4) = KNOWN_EPSG.iter()
            .find(|(known, _, _)| *known == code)
            .ok_or_else(|| anyhow!("[geom::crs] unsupported EPSG code {code}; supply a PROJ.4 string instead"))?;
        Ok(Self {
            label: format!("EPSG:{code}"),
            proj4: proj4.to_string(),
            geographic: is_longlat(proj4),
        })
    }

    /// Parse `EPSG:nnnn`, an OGC URN (`urn:ogc:def:crs:EPSG::nnnn`, `...:CRS84`) or a PROJ.4 string.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.starts_with('+') {
            return Ok(Self {
                label: s.to_string(),
                proj4: s.to_string(),
                geographic: is_longlat(s),
            });
        }
        if s.to_ascii_uppercase().ends_with("CRS84") {
            return Ok(Self::wgs84());
        }
        match EPSG_NAME.captures(s) {
            Some(caps) => {
                let code = caps[1].parse::<u32>()
                    .with_context(|| format!("[geom::crs] bad EPSG code in {s:?}"))?;
                Self::from_epsg(code)
            }
            None => bail!("[geom::crs] unrecognized CRS {s:?}"),
        }
    }

    /// Best-effort identification of an ESRI `.prj` WKT string.
    pub fn from_wkt(wkt: &str) -> Option<Self> {
        if let Some(caps) = WKT_AUTHORITY.captures(wkt.trim()) {
            if let Some(crs) = caps[1].parse::<u32>().ok().and_then(|code| Self::from_epsg(code).ok()) {
                return Some(crs);
            }
        }

        let upper = wkt.to_ascii_uppercase();
        let projected = upper.trim_start().starts_with("PROJCS");
        let code = if upper.contains("WEB_MERCATOR") || upper.contains("PSEUDO_MERCATOR") || upper.contains("PSEUDO-MERCATOR") {
            3857
        } else if projected {
            (48..=51).find(|zone| upper.contains(&format!("UTM_ZONE_{zone}N")) || upper.contains(&format!("UTM ZONE {zone}N")))
                .map(|zone| 32600 + zone)?
        } else if upper.contains("CGCS_2000") || upper.contains("CGCS2000") || upper.contains("CHINA_2000") {
            4490
        } else if upper.contains("BEIJING_1954") || upper.contains("BEIJING 1954") {
            4214
        } else if upper.contains("XIAN_1980") || upper.contains("XIAN 1980") {
            4610
        } else if upper.contains("WGS_1984") || upper.contains("WGS 84") || upper.contains("WGS84") {
            4326
        } else {
            return None;
        };
        Self::from_epsg(code).ok()
    }

    /// Short human-readable name.
    pub fn label(&self) -> &str { &self.label }

    /// Full PROJ.4 definition.
    pub fn proj4(&self) -> &str { &self.proj4 }

    /// Whether coordinates are longitude/latitude degrees.
    pub fn is_geographic(&self) -> bool { self.geographic }

    /// Two CRS are the same when their definitions match.
    pub fn same_as(&self, other: &Crs) -> bool {
        normalize(&self.proj4) == normalize(&other.proj4)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

fn is_longlat(proj4: &str) -> bool {
    proj4.contains("+proj=longlat") || proj4.contains("+proj=latlong")
}

/// PROJ.4 parameters that carry meaning for a transform; CRS markers and the null grid are dropped.
fn proj_params(proj4: &str) -> impl Iterator<Item = &str> {
    proj4.split_whitespace()
        .filter(|part| !matches!(*part, "+type=crs" | "+no_defs" | "+wktext" | "+nadgrids=@null"))
}

/// Order-insensitive form of a PROJ.4 string.
fn normalize(proj4: &str) -> Vec<&str> {
    let mut parts = proj_params(proj4).collect::<Vec<_>>();
    parts.sort_unstable();
    parts
}

/// Coordinate transform between two CRS (degrees → radians handled in code).
pub(crate) struct Reprojector {
    from: Proj4,
    to: Proj4,
    from_geographic: bool,
    to_geographic: bool,
}

impl Reprojector {
    pub(crate) fn new(from: &Crs, to: &Crs) -> Result<Self> {
        let build = |crs: &Crs| {
            let definition = proj_params(crs.proj4()).collect::<Vec<_>>().join(" ");
            Proj4::from_proj_string(&definition)
                .map_err(|e| anyhow!("[geom::crs] failed to build PROJ.4 {definition:?}: {e}"))
        };
        Ok(Self {
            from: build(from)?,
            to: build(to)?,
            from_geographic: from.is_geographic(),
            to_geographic: to.is_geographic(),
        })
    }

    /// Transform one coordinate.
    pub(crate) fn coord(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        let mut point = if self.from_geographic {
            (coord.x.to_radians(), coord.y.to_radians(), 0.0)
        } else {
            (coord.x, coord.y, 0.0)
        };
        transform(&self.from, &self.to, &mut point)
            .map_err(|e| anyhow!("[geom::crs] transform failed at ({}, {}): {e}", coord.x, coord.y))?;

        Ok(if self.to_geographic {
            Coord { x: point.0.to_degrees(), y: point.1.to_degrees() }
        } else {
            Coord { x: point.0, y: point.1 }
        })
    }

    /// Transform every coordinate of a MultiPolygon.
    pub(crate) fn multipolygon(&self, shape: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>> {
        shape.try_map_coords(|coord| self.coord(coord))
    }
}

#[cfg(test)]
mod tests {
    use geo::Coord;

    use super::{Crs, Reprojector};

    #[test]
    fn parse_epsg_forms() {
        assert_eq!(Crs::parse("EPSG:4326").unwrap().label(), "EPSG:4326");
        assert_eq!(Crs::parse("epsg:4490").unwrap().label(), "EPSG:4490");
        assert_eq!(Crs::parse("urn:ogc:def:crs:EPSG::3857").unwrap().label(), "EPSG:3857");
        assert_eq!(Crs::parse("urn:ogc:def:crs:EPSG:6.6:32650").unwrap().label(), "EPSG:32650");
        assert!(Crs::parse("urn:ogc:def:crs:OGC:1.3:CRS84").unwrap().same_as(&Crs::wgs84()));
        assert!(Crs::parse("EPSG:99999").is_err());
        assert!(Crs::parse("mercator-ish").is_err());
    }

    #[test]
    fn parse_proj4_string() {
        let crs = Crs::parse("+proj=longlat +datum=WGS84 +no_defs").unwrap();
        assert!(crs.is_geographic());
        assert!(crs.same_as(&Crs::wgs84()));
        assert!(!Crs::parse("+proj=utm +zone=50 +datum=WGS84").unwrap().is_geographic());
    }

    #[test]
    fn geographic_flags() {
        assert!(Crs::wgs84().is_geographic());
        assert!(Crs::from_epsg(4490).unwrap().is_geographic());
        assert!(!Crs::from_epsg(3857).unwrap().is_geographic());
        assert!(!Crs::wgs84().same_as(&Crs::from_epsg(4490).unwrap()));
    }

    #[test]
    fn wkt_identification() {
        let wgs = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;
        assert_eq!(Crs::from_wkt(wgs).unwrap().label(), "EPSG:4326");

        let cgcs = r#"GEOGCS["GCS_China_Geodetic_Coordinate_System_2000",DATUM["D_China_2000",SPHEROID["CGCS2000",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;
        assert_eq!(Crs::from_wkt(cgcs).unwrap().label(), "EPSG:4490");

        let utm = r#"PROJCS["WGS_1984_UTM_Zone_50N",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]]],PROJECTION["Transverse_Mercator"]]"#;
        assert_eq!(Crs::from_wkt(utm).unwrap().label(), "EPSG:32650");

        let authority = r#"GEOGCS["WGS 84",DATUM["WGS_1984"],AUTHORITY["EPSG","4326"]]"#;
        assert_eq!(Crs::from_wkt(authority).unwrap().label(), "EPSG:4326");

        assert!(Crs::from_wkt(r#"LOCAL_CS["arbitrary"]"#).is_none());
    }

    #[test]
    fn utm_round_trip_near_beijing() {
        let utm = Crs::from_epsg(32650).unwrap();
        let forward = Reprojector::new(&Crs::wgs84(), &utm).unwrap();
        let back = Reprojector::new(&utm, &Crs::wgs84()).unwrap();

        let beijing = Coord { x: 116.4, y: 39.9 };
        let projected = forward.coord(beijing).unwrap();
        // zone 50 central meridian is 117°E, so Beijing sits ~51 km west of the false easting
        assert!((projected.x - 448_800.0).abs() < 2_000.0, "easting {}", projected.x);
        assert!((projected.y - 4_416_500.0).abs() < 5_000.0, "northing {}", projected.y);

        let restored = back.coord(projected).unwrap();
        assert!((restored.x - beijing.x).abs() < 1e-6);
        assert!((restored.y - beijing.y).abs() < 1e-6);
    }
}
