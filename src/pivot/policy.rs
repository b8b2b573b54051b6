/// Admissions policy categories as published. `Total` is the aggregate over the others.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AdmissionsPolicy {
    Total,
    Selective,
    NonSelective,
    NotApplicable,
    Unknown,
}

impl AdmissionsPolicy {
    /// In label order.
    pub const ALL: [AdmissionsPolicy; 5] = [
        AdmissionsPolicy::NonSelective,
        AdmissionsPolicy::NotApplicable,
        AdmissionsPolicy::Selective,
        AdmissionsPolicy::Total,
        AdmissionsPolicy::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionsPolicy::Total => "Total",
            AdmissionsPolicy::Selective => "Selective",
            AdmissionsPolicy::NonSelective => "Non-selective",
            AdmissionsPolicy::NotApplicable => "Not applicable",
            AdmissionsPolicy::Unknown => "Unknown",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "total" => Some(AdmissionsPolicy::Total),
            "selective" => Some(AdmissionsPolicy::Selective),
            "non-selective" | "non selective" => Some(AdmissionsPolicy::NonSelective),
            "not applicable" => Some(AdmissionsPolicy::NotApplicable),
            "unknown" => Some(AdmissionsPolicy::Unknown),
            _ => None,
        }
    }
}
