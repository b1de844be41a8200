//! Apache Derby.

use super::{db2, Capabilities, DBDictionary};
use crate::driver::DriverMetadata;

pub(crate) fn dictionary() -> DBDictionary {
    let mut dict = DBDictionary::base();
    db2::configure(&mut dict);
    dict.platform = String::from("Apache Derby");

    dict.error_codes = dict
        .error_codes
        .clone()
        .extend(&["40XL1", "40XL2", "40001"], &["XCL52"], &[]);

    dict.generators.connected_configuration = connected_configuration;
    dict
}

/// `OFFSET`/`FETCH` arrived in 10.5; older servers page client-side.
fn connected_configuration(
    _dict: &DBDictionary,
    _meta: &DriverMetadata,
    version: (u32, u32),
    caps: &mut Capabilities,
) {
    if version < (10, 5) {
        caps.supports_select_start_index = false;
        caps.supports_select_end_index = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{FilterValue, SqlBuffer};
    use crate::dictionary::{RangeContext, UNBOUNDED};
    use crate::exceptions::{SqlError, StoreErrorKind};
    use std::sync::Arc;

    #[test]
    fn test_offset_fetch() {
        let dict = dictionary();
        let mut buf = SqlBuffer::new();
        dict.append_select_range(&mut buf, &RangeContext::new(20, 30));
        assert_eq!(buf.to_sql(), " OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY");

        let mut buf = SqlBuffer::new();
        dict.append_select_range(&mut buf, &RangeContext::new(20, UNBOUNDED));
        assert_eq!(buf.to_sql(), " OFFSET 20 ROWS");
    }

    #[test]
    fn test_substr_and_locate() {
        let dict = dictionary();
        let mut buf = SqlBuffer::new();
        dict.substring(&mut buf, &FilterValue::expr("t0.S"), &FilterValue::Number(0), Some(&FilterValue::Number(4)));
        assert_eq!(buf.to_sql(), "SUBSTR(t0.S, 1, 4)");

        let mut buf = SqlBuffer::new();
        dict.index_of(&mut buf, &FilterValue::expr("t0.S"), &FilterValue::expr("'x'"), None)
            .unwrap();
        assert_eq!(buf.to_sql(), "(LOCATE('x', t0.S) - 1)");
    }

    #[test]
    fn test_old_derby_pages_client_side() {
        let dict = dictionary();
        dict.connected_configuration(&DriverMetadata {
            database_product_version: String::from("10.4.2.0 - (689064)"),
            ..DriverMetadata::default()
        });
        assert!(!dict.capabilities().supports_select_start_index);
        assert!(!dict.capabilities().supports_select_end_index);
    }

    #[test]
    fn test_lock_timeout_classification() {
        let dict = dictionary();
        let err = Arc::new(SqlError::new("lock could not be obtained").with_sql_state("40XL1"));
        let store = dict.new_store_exception(String::from("select failed"), vec![err], None);
        assert_eq!(store.kind, StoreErrorKind::Lock);
    }
}
