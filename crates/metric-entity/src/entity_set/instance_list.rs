use std::collections::BTreeSet;

use metric_core::errors::EntityError;

/// Parse an entity-set instance list such as `"1|3:5|9"`.
///
/// Items are separated by `|`; `a:b` is an inclusive range. Whitespace
/// around items is ignored and empty items are skipped.
pub fn parse_instance_list(input: &str) -> Result<BTreeSet<i32>, EntityError> {
    let invalid = |reason: String| EntityError::InvalidInstanceList {
        input: input.to_string(),
        reason,
    };

    let mut ids = BTreeSet::new();
    for item in input.split('|').map(str::trim).filter(|s| !s.is_empty()) {
        match item.split_once(':') {
            Some((lo, hi)) => {
                let lo: i32 = lo
                    .trim()
                    .parse()
                    .map_err(|_| invalid(format!("bad range start in {item:?}")))?;
                let hi: i32 = hi
                    .trim()
                    .parse()
                    .map_err(|_| invalid(format!("bad range end in {item:?}")))?;
                if lo > hi {
                    return Err(invalid(format!("range {item:?} is reversed")));
                }
                ids.extend(lo..=hi);
            }
            None => {
                let id: i32 = item
                    .parse()
                    .map_err(|_| invalid(format!("bad id {item:?}")))?;
                ids.insert(id);
            }
        }
    }
    Ok(ids)
}
