// Configuration for an annotation run

/// Text inserted after every call made through a function pointer
pub const DEFAULT_MARKER: &str = " /*FP*/";

/// Type names from the standard headers. Headers are never read, so these
/// are declared as opaque typedef names before parsing starts.
pub const BUILTIN_TYPE_NAMES: &[&str] = &[
    "size_t",
    "ssize_t",
    "ptrdiff_t",
    "intptr_t",
    "uintptr_t",
    "intmax_t",
    "uintmax_t",
    "wchar_t",
    "wint_t",
    "int8_t",
    "int16_t",
    "int32_t",
    "int64_t",
    "uint8_t",
    "uint16_t",
    "uint32_t",
    "uint64_t",
    "off_t",
    "pid_t",
    "time_t",
    "clock_t",
    "va_list",
    "__builtin_va_list",
    "FILE",
    "fpos_t",
    "jmp_buf",
    "sig_atomic_t",
    "pthread_t",
    "pthread_mutex_t",
];

/// Settings for [`crate::annotate`]
#[derive(Debug, Clone)]
pub struct LiftConfig {
    /// Inserted after each function-pointer call
    pub marker: String,
    /// Declare [`BUILTIN_TYPE_NAMES`] before parsing
    pub builtin_type_names: bool,
    /// Further names to treat as typedef names (types from unseen headers)
    pub extra_type_names: Vec<String>,
}

impl Default for LiftConfig {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            builtin_type_names: true,
            extra_type_names: Vec::new(),
        }
    }
}

impl LiftConfig {
    pub fn with_type_name(mut self, name: impl Into<String>) -> Self {
        self.extra_type_names.push(name.into());
        self
    }

    /// Every name the parser should treat as a typedef name
    pub fn type_names(&self) -> impl Iterator<Item = &str> + '_ {
        let builtin: &[&str] = if self.builtin_type_names {
            BUILTIN_TYPE_NAMES
        } else {
            &[]
        };
        builtin
            .iter()
            .copied()
            .chain(self.extra_type_names.iter().map(String::as_str))
    }
}
