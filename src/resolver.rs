//! Physical index naming.
//!
//! Documents of one entity type and tenant are range-sharded into indices
//! holding [`BUCKET_WIDTH`] consecutive ids each:
//! `{prefix}_{tenant}_{id / 1_000_000}m`, all lowercase.

use crate::types::DocumentId;

/// Number of consecutive document ids sharing one physical index.
pub const BUCKET_WIDTH: u64 = 1_000_000;

/// Bucket number of `doc_id` (floor division by [`BUCKET_WIDTH`]).
pub fn shard_bucket(doc_id: DocumentId) -> u64 {
    doc_id.get() / BUCKET_WIDTH
}

/// Resolve the physical index that holds `doc_id` for `tenant`.
///
/// Pure and total. The store refuses uppercase index names, so both the
/// prefix and the tenant are case-folded here; other character constraints
/// are enforced upstream by [`crate::TenantId`] and the schema builder.
pub fn resolve_index_name(prefix: &str, tenant: &str, doc_id: DocumentId) -> String {
    format!(
        "{}_{}_{}m",
        prefix.to_lowercase(),
        tenant.to_lowercase(),
        shard_bucket(doc_id)
    )
}

/// Wildcard pattern covering every bucket of one tenant's entity indices.
pub fn index_pattern(prefix: &str, tenant: &str) -> String {
    format!("{}_{}_*", prefix.to_lowercase(), tenant.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> DocumentId {
        DocumentId::new(n).unwrap()
    }

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(resolve_index_name("jobs", "vo", id(0)), "jobs_vo_0m");
        assert_eq!(resolve_index_name("jobs", "vo", id(999_999)), "jobs_vo_0m");
        assert_eq!(resolve_index_name("jobs", "vo", id(1_000_000)), "jobs_vo_1m");
    }

    #[test]
    fn test_spec_example() {
        assert_eq!(
            resolve_index_name("job_parameters", "lhcb", id(2_450_000)),
            "job_parameters_lhcb_2m"
        );
        assert_eq!(
            resolve_index_name("job_parameters", "LHCb", id(2_450_321)),
            "job_parameters_lhcb_2m"
        );
    }

    #[test]
    fn test_same_bucket_same_index() {
        for base in [0u64, 7, 41, 12_345] {
            let lo = base * BUCKET_WIDTH;
            let hi = lo + BUCKET_WIDTH - 1;
            assert_eq!(
                resolve_index_name("jobs", "Vo", id(lo)),
                resolve_index_name("jobs", "vO", id(hi))
            );
            assert_ne!(
                resolve_index_name("jobs", "vo", id(hi)),
                resolve_index_name("jobs", "vo", id(hi + 1))
            );
        }
    }

    #[test]
    fn test_output_is_lowercase() {
        for tenant in ["LHCB", "Gridpp", "dteam", "ÉQUIPE"] {
            let name = resolve_index_name("JOBS", tenant, id(5));
            assert_eq!(name, name.to_lowercase());
        }
    }

    #[test]
    fn test_unbounded_buckets() {
        assert_eq!(
            resolve_index_name("jobs", "vo", id(DocumentId::MAX)),
            format!("jobs_vo_{}m", DocumentId::MAX / BUCKET_WIDTH)
        );
    }

    #[test]
    fn test_index_pattern() {
        assert_eq!(index_pattern("job_parameters", "LHCb"), "job_parameters_lhcb_*");
    }
}
