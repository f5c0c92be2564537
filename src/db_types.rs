use std::fmt;
use std::str::FromStr;

/// Sort dimension for album and photo listings. Albums sort by name or
/// creation time, photos by name or upload time; the store picks the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Name,
    Date,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Name => "byName",
            SortField::Date => "byDate",
        }
    }
}

impl FromStr for SortField {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "byName" | "name" => Ok(SortField::Name),
            "byDate" | "date" => Ok(SortField::Date),
            _ => Err(()),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// SQL keyword; only ever interpolated from this fixed set.
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(()),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_field_parsing() {
        assert_eq!(SortField::from_str("byName"), Ok(SortField::Name));
        assert_eq!(SortField::from_str("byDate"), Ok(SortField::Date));
        assert_eq!(SortField::from_str("date"), Ok(SortField::Date));
        assert!(SortField::from_str("bySize").is_err());
        assert!(SortField::from_str("").is_err());
    }

    #[test]
    fn test_sort_order_parsing() {
        assert_eq!(SortOrder::from_str("asc"), Ok(SortOrder::Asc));
        assert_eq!(SortOrder::from_str("desc"), Ok(SortOrder::Desc));
        assert!(SortOrder::from_str("descending").is_err());
    }
}
