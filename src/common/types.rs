/// Profile the daemon reports through `API/current_profile`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileMode {
    Initializing,
    Performance,
    Balanced,
    Eco,
}

impl ProfileMode {
    pub fn from_api_value(s: &str) -> Option<Self> {
        match s.trim() {
            "0" => Some(Self::Initializing),
            "1" => Some(Self::Performance),
            "2" => Some(Self::Balanced),
            "3" => Some(Self::Eco),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProfileMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initializing => write!(f, "Initializing"),
            Self::Performance => write!(f, "Performance"),
            Self::Balanced => write!(f, "Balanced"),
            Self::Eco => write!(f, "ECO Mode"),
        }
    }
}

/// Service state derived from `pidof`, the current profile and the AI flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceState {
    Suspended,
    Initializing { pid: String },
    RunningAuto { pid: String },
    RunningIdle { pid: String },
    UnknownProfile { pid: String },
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Suspended => write!(f, "Suspended"),
            Self::Initializing { pid } => write!(f, "Initializing (PID {})", pid),
            Self::RunningAuto { pid } => write!(f, "Running (auto) (PID {})", pid),
            Self::RunningIdle { pid } => write!(f, "Running (idle) (PID {})", pid),
            Self::UnknownProfile { pid } => write!(f, "Unknown profile (PID {})", pid),
        }
    }
}
