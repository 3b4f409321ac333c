//! Property-based tests for trueno-lineage
//!
//! - Version algebra invariants (proptest)
//! - Catalog inclusion algebra (quickcheck)
//! - Run with ProptestConfig::with_cases(100)

use proptest::prelude::*;
use quickcheck::{Arbitrary, Gen, QuickCheck};
use trueno_lineage::catalog::{DataCatalog, Dtype, Feature, ANY_AXIS};
use trueno_lineage::graph::{extract_singleton_parent, ArtefactId, RelationshipId, RelationshipRecord};
use trueno_lineage::Version;

// ============================================================================
// Strategies
// ============================================================================

fn arb_version() -> impl Strategy<Value = Version> {
    (0u64..5, 0u64..5, 0u64..5).prop_map(|(a, b, c)| Version::new(a, b, c))
}

// ============================================================================
// Version properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_version_string_round_trip(a in any::<u64>(), b in any::<u64>(), c in any::<u64>()) {
        let version = Version::new(a, b, c);
        prop_assert_eq!(Version::parse(&version.to_string()).unwrap(), version);
    }

    #[test]
    fn prop_version_order_transitive(a in arb_version(), b in arb_version(), c in arb_version()) {
        if a < b && b < c {
            prop_assert!(a < c);
        }
    }

    #[test]
    fn prop_version_order_total(a in arb_version(), b in arb_version()) {
        let relations = [a < b, a == b, a > b];
        prop_assert_eq!(relations.iter().filter(|r| **r).count(), 1);
    }

    #[test]
    fn prop_compatibility_symmetric(a in arb_version(), b in arb_version()) {
        prop_assert_eq!(a.is_compatible(&b), b.is_compatible(&a));
    }

    #[test]
    fn prop_patch_and_minor_bumps_stay_compatible(v in arb_version().prop_filter("stable", |v| v.major > 0)) {
        prop_assert!(v.next_patch().unwrap().is_compatible(&v));
        prop_assert!(v.next_minor().unwrap().is_compatible(&v));
        prop_assert!(!v.next_major().unwrap().is_compatible(&v));
    }

    #[test]
    fn prop_bumps_increase(v in arb_version()) {
        prop_assert!(v.next_patch().unwrap() > v);
        prop_assert!(v.next_minor().unwrap() > v);
        prop_assert!(v.next_major().unwrap() > v);
    }

    #[test]
    fn prop_parse_accepts_exactly_three_components(s in "[0-9]{1,3}(\\.[0-9]{1,3}){0,4}") {
        prop_assert_eq!(Version::parse(&s).is_ok(), s.split('.').count() == 3);
    }

    #[test]
    fn prop_singleton_needs_exactly_one_edge(parents in proptest::collection::vec(1u64..50, 0..4)) {
        let child = ArtefactId(100);
        let edges: Vec<RelationshipRecord> = parents
            .iter()
            .enumerate()
            .map(|(i, parent)| RelationshipRecord {
                id: RelationshipId(i as u64),
                relationship_type: "batch_formula".to_string(),
                parent: ArtefactId(*parent),
                child,
                creation_time: chrono::Utc::now(),
            })
            .collect();
        let resolved = extract_singleton_parent(&edges, child, "batch_formula");
        prop_assert_eq!(resolved.is_ok(), parents.len() == 1);
    }
}

// ============================================================================
// Catalog properties
// ============================================================================

#[derive(Debug, Clone)]
struct ArbCatalog(DataCatalog);

fn arb_dtype(g: &mut Gen) -> Dtype {
    *g.choose(&[Dtype::Int32, Dtype::Int64, Dtype::Float32, Dtype::Float64, Dtype::String])
        .unwrap_or(&Dtype::Float32)
}

impl Arbitrary for ArbCatalog {
    fn arbitrary(g: &mut Gen) -> Self {
        let count = usize::arbitrary(g) % 5;
        let features = (0..count).map(|i| {
            let rank = usize::arbitrary(g) % 3;
            let shape: Vec<i64> = (0..rank)
                .map(|_| if bool::arbitrary(g) { ANY_AXIS } else { i64::from(u8::arbitrary(g) % 8) })
                .collect();
            Feature::new(format!("f{i}"), arb_dtype(g), shape).unwrap()
        });
        Self(DataCatalog::new(features.collect::<Vec<_>>()).unwrap())
    }
}

#[test]
fn qc_includes_is_reflexive() {
    fn prop(catalog: ArbCatalog) -> bool {
        catalog.0.includes(&catalog.0)
    }
    QuickCheck::new().tests(200).quickcheck(prop as fn(ArbCatalog) -> bool);
}

#[test]
fn qc_everything_includes_empty() {
    fn prop(catalog: ArbCatalog) -> bool {
        catalog.0.includes(&DataCatalog::default())
    }
    QuickCheck::new().tests(100).quickcheck(prop as fn(ArbCatalog) -> bool);
}

#[test]
fn qc_json_round_trip_preserves_inclusion() {
    fn prop(a: ArbCatalog, b: ArbCatalog) -> bool {
        let a2 = DataCatalog::from_json(&a.0.to_json()).unwrap();
        let b2 = DataCatalog::from_json(&b.0.to_json()).unwrap();
        a2 == a.0 && a.0.includes(&b.0) == a2.includes(&b2)
    }
    QuickCheck::new().tests(200).quickcheck(prop as fn(ArbCatalog, ArbCatalog) -> bool);
}

#[test]
fn qc_missing_from_empty_iff_includes() {
    fn prop(a: ArbCatalog, b: ArbCatalog) -> bool {
        a.0.missing_from(&b.0).is_empty() == a.0.includes(&b.0)
    }
    QuickCheck::new().tests(200).quickcheck(prop as fn(ArbCatalog, ArbCatalog) -> bool);
}
