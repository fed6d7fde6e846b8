use serde::Deserialize;

/// `?limit=&offset=` for history listings. No limit means everything.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

impl Pagination {
    /// SQLite reads a negative LIMIT as "no limit".
    pub fn sql_limit(&self) -> i64 {
        self.limit.filter(|l| *l >= 0).unwrap_or(-1)
    }

    pub fn sql_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_everything() {
        let p = Pagination::default();
        assert_eq!((p.sql_limit(), p.sql_offset()), (-1, 0));
    }

    #[test]
    fn clamps_negative_values() {
        let p = Pagination {
            limit: Some(-5),
            offset: Some(-3),
        };
        assert_eq!((p.sql_limit(), p.sql_offset()), (-1, 0));

        let p = Pagination {
            limit: Some(10),
            offset: Some(20),
        };
        assert_eq!((p.sql_limit(), p.sql_offset()), (10, 20));
    }
}
