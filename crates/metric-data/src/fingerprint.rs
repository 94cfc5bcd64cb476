use std::fmt;

use metric_core::traits::FetchRequest;

/// Identity of a fetch: two requests with the same fingerprint load the
/// same rows. Field names and target ids are order-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchFingerprint(blake3::Hash);

impl FetchFingerprint {
    pub fn of(request: &FetchRequest) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"subset\0");
        hasher.update(request.subset.as_str().as_bytes());

        let mut names: Vec<&str> = request.field_names().collect();
        names.sort_unstable();
        names.dedup();
        hasher.update(b"\0fields\0");
        for name in names {
            hasher.update(name.as_bytes());
            hasher.update(b"\0");
        }

        hasher.update(b"types\0");
        hasher.update(request.entity_types.join("|").as_bytes());

        let mut targets: Vec<_> = request.targets.iter().collect();
        targets.sort_by(|a, b| a.entity_type.cmp(&b.entity_type));
        for target in targets {
            hasher.update(b"\0target\0");
            hasher.update(target.entity_type.as_bytes());
            // BTreeSet iterates in ascending order.
            for id in &target.instance_ids {
                hasher.update(&id.to_le_bytes());
            }
        }

        hasher.update(b"\0range\0");
        if let Some(range) = request.range {
            hasher.update(range.to_string().as_bytes());
        }
        Self(hasher.finalize())
    }
}

impl fmt::Display for FetchFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.0.to_hex();
        f.write_str(&hex.as_str()[..16])
    }
}
