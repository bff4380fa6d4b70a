/// Offset added to secondary catalog indices when none is configured
pub const DEFAULT_MERGE_OFFSET: usize = 100;

/// Kelvin to degrees Celsius
pub const ZERO_CELSIUS: f64 = 273.15;

/// Monthly time steps per member
pub const MONTHS: usize = 12;

/// Days of the previous year prepended to cross-year control windows
pub const CROSS_YEAR_TAIL: usize = 30;
/// Days of the following year appended to cross-year control windows
pub const CROSS_YEAR_HEAD: usize = 60;

/// Length of the header record at the start of every `.r8` file
pub const RECORD_HEADER: usize = 8;
