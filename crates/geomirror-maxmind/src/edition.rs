//! GeoLite2 editions mirrored by the pipeline

/// Suffix of the binary database file inside an edition archive
pub const ARTIFACT_SUFFIX: &str = ".mmdb";

/// Known GeoLite2 database editions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Edition {
    Asn,
    City,
    Country,
}

impl Edition {
    /// All editions in processing order
    pub const ALL: [Edition; 3] = [Self::Asn, Self::City, Self::Country];

    /// Parse an edition id (`GeoLite2-City`) or its package name (`geolite2-city`)
    pub fn from_name(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|e| e.id() == s || e.package_name() == s)
    }

    /// MaxMind edition id, used in download URLs
    pub fn id(self) -> &'static str {
        match self {
            Self::Asn => "GeoLite2-ASN",
            Self::City => "GeoLite2-City",
            Self::Country => "GeoLite2-Country",
        }
    }

    /// Human-readable name
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Asn => "GeoLite2 ASN",
            Self::City => "GeoLite2 City",
            Self::Country => "GeoLite2 Country",
        }
    }

    /// Unscoped registry package name (registry names must be lowercase)
    pub fn package_name(self) -> &'static str {
        match self {
            Self::Asn => "geolite2-asn",
            Self::City => "geolite2-city",
            Self::Country => "geolite2-country",
        }
    }
}

impl std::fmt::Display for Edition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}
