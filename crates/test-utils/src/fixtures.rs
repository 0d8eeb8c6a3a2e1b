//! Common fixtures: monitored sites and reference dates.

/// Sites from the default watch list.
pub mod sites {
    use volcano_common::Site;

    /// (name, lat, lon)
    pub const VILLARRICA: (&str, f64, f64) = ("Villarrica", -39.42, -71.93);
    pub const LLAIMA: (&str, f64, f64) = ("Llaima", -38.69, -71.73);
    pub const CALBUCO: (&str, f64, f64) = ("Calbuco", -41.33, -72.61);

    /// Default fetch radius in km.
    pub const DEFAULT_RADIUS_KM: f64 = 3.0;

    pub fn site((name, lat, lon): (&str, f64, f64)) -> Site {
        Site::new(name, lat, lon, DEFAULT_RADIUS_KM)
    }

    pub fn villarrica() -> Site {
        site(VILLARRICA)
    }

    pub fn llaima() -> Site {
        site(LLAIMA)
    }

    /// An entry that is kept in config but not processed by default.
    pub fn inactive_calbuco() -> Site {
        let mut s = site(CALBUCO);
        s.active = false;
        s
    }
}

/// Reference dates.
pub mod dates {
    use chrono::NaiveDate;

    /// Day used as "today" in pipeline tests.
    pub const TODAY: &str = "2025-03-01";

    pub fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("fixture date")
    }

    pub fn today() -> NaiveDate {
        date(TODAY)
    }
}
