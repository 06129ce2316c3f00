//! Access engine integration tests
//!
//! Covers the decision order (unmanaged, owner, manager, ungoverned,
//! group evaluation), exclusion sets, group listings and the group
//! lifecycle pass-through.

use access_groups::access_control::{
    AccessEngine, AccessMode, AccessOperation, DecisionReason, GroupOutcome, ObjectKind,
};
use access_groups::config::AppConfig;
use access_groups::group::Group;
use access_groups::store::{MemoryCache, MemoryGroupStore, MemoryRepository, StaticPrincipal};
use rstest::rstest;
use std::collections::BTreeSet;
use std::sync::Arc;

// =============================================================================
// Test Helpers
// =============================================================================

/// Items 10 -> 11 -> 12, standalone item 20 tagged with term "local"
/// (child of "news"), standalone item 30.
fn site() -> MemoryRepository {
    MemoryRepository::new()
        .with_item("10", None, "page")
        .with_item("11", Some("10"), "page")
        .with_item("12", Some("11"), "page")
        .with_item("20", None, "post")
        .with_item("30", None, "post")
        .with_term("news", None, "category")
        .with_term("local", Some("news"), "category")
        .with_link("20", "local")
        .with_user("alice", &["editor"])
        .with_user("bob", &[])
        .with_user("carol", &["subscriber"])
}

/// G1: write none, read group, owns item 10, allows 10.0.0.0-10.0.0.255
fn g1() -> Group {
    Group::new(1, "G1")
        .with_access(AccessMode::Group, AccessMode::None)
        .with_ip_ranges(["10.0.0.0-10.0.0.255"])
        .with_object(ObjectKind::ContentItem, "page", "10")
}

fn engine_with(
    config: &AppConfig,
    repo: MemoryRepository,
    principal: StaticPrincipal,
    groups: Vec<Group>,
) -> AccessEngine {
    AccessEngine::builder(config)
        .repository(Arc::new(repo))
        .principal(Arc::new(principal))
        .group_store(Arc::new(MemoryGroupStore::with_groups(groups)))
        .build()
        .unwrap()
}

fn engine(principal: StaticPrincipal, groups: Vec<Group>) -> AccessEngine {
    engine_with(&AppConfig::default(), site(), principal, groups)
}

fn ids(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

// =============================================================================
// 1. Decision scenarios
// =============================================================================

mod decisions {
    use super::*;

    #[test]
    fn test_g1_denies_non_member_when_editing() {
        let engine = engine(StaticPrincipal::user("bob").in_admin_context(), vec![g1()]);
        assert_eq!(engine.default_operation(), AccessOperation::Write);
        assert!(!engine.check_access("page", "11").unwrap());
    }

    #[test]
    fn test_g1_denies_non_member_when_viewing() {
        let engine = engine(StaticPrincipal::user("bob"), vec![g1()]);
        assert!(!engine.check_access("page", "11").unwrap());
        assert!(!engine.check_access("page", "12").unwrap());
    }

    #[rstest]
    #[case("10.0.0.17", true)]
    #[case("10.0.0.255", true)]
    #[case("10.0.1.0", false)]
    #[case("not-an-ip", false)]
    fn test_g1_ip_match_when_viewing(#[case] ip: &str, #[case] expected: bool) {
        let engine = engine(StaticPrincipal::user("bob").with_ip(ip), vec![g1()]);
        assert_eq!(engine.check_access("page", "11").unwrap(), expected);
    }

    #[test]
    fn test_member_passes_g1() {
        let group = g1().with_object(ObjectKind::User, "user", "bob");
        let engine = engine(StaticPrincipal::user("bob").in_admin_context(), vec![group]);
        assert!(engine.check_access("page", "11").unwrap());
    }

    #[test]
    fn test_role_holder_passes_group() {
        let group = Group::new(2, "G2")
            .with_object(ObjectKind::Role, "role", "editor")
            .with_object(ObjectKind::ContentItem, "post", "30");

        let alice = engine(StaticPrincipal::user("alice"), vec![group.clone()]);
        assert!(alice.check_access("post", "30").unwrap());

        let carol = engine(StaticPrincipal::user("carol"), vec![group]);
        assert!(!carol.check_access("post", "30").unwrap());
    }

    #[test]
    fn test_term_assignment_governs_tagged_item() {
        let group = Group::new(3, "newsroom").with_object(ObjectKind::Term, "category", "news");
        let engine = engine(StaticPrincipal::user("bob"), vec![group]);

        assert!(!engine.check_access("post", "20").unwrap());
        assert!(!engine.check_access("category", "local").unwrap());
        assert!(engine.check_access("post", "30").unwrap());
    }

    #[test]
    fn test_anonymous_principal_denied() {
        let engine = engine(StaticPrincipal::anonymous(), vec![g1()]);
        assert!(!engine.check_access("page", "10").unwrap());
    }

    #[test]
    fn test_memoized_decision_survives_until_reset() {
        let engine = engine(StaticPrincipal::user("bob"), vec![g1()]);
        assert!(!engine.check_access("page", "11").unwrap());
        assert!(!engine.check_access("page", "11").unwrap());
        engine.reset_cache();
        assert!(!engine.check_access("page", "11").unwrap());
    }
}

// =============================================================================
// 2. Short-circuit rules
// =============================================================================

mod short_circuits {
    use super::*;

    #[test]
    fn test_unmanaged_type_is_granted() {
        let engine = engine(StaticPrincipal::anonymous(), vec![g1()]);
        assert!(engine.check_access("comment", "10").unwrap());
        assert_eq!(
            engine
                .explain_access("comment", "10", AccessOperation::Read)
                .unwrap()
                .reason,
            DecisionReason::Unmanaged
        );
    }

    #[test]
    fn test_ungoverned_objects_are_granted() {
        let engine = engine(StaticPrincipal::anonymous(), vec![g1()]);
        for (object_type, id) in [("post", "30"), ("page", "99"), ("role", "editor"), ("user", "bob")] {
            assert!(engine.check_access(object_type, id).unwrap(), "{object_type} {id}");
        }
    }

    #[test]
    fn test_owner_auto_access() {
        let repo = site().with_owner(ObjectKind::ContentItem, "11", "bob");
        let engine = engine_with(&AppConfig::default(), repo, StaticPrincipal::user("bob"), vec![g1()]);
        assert!(engine.check_access("page", "11").unwrap());
        assert!(!engine.check_access("page", "12").unwrap());
    }

    #[test]
    fn test_owner_auto_access_disabled() {
        let mut config = AppConfig::default();
        config.policy.owner_auto_access = false;
        let repo = site().with_owner(ObjectKind::ContentItem, "11", "bob");
        let engine = engine_with(&config, repo, StaticPrincipal::user("bob"), vec![g1()]);
        assert!(!engine.check_access("page", "11").unwrap());
    }

    #[test]
    fn test_manager_bypasses_groups() {
        let principal = StaticPrincipal::user("bob")
            .in_admin_context()
            .with_capability("manage_user_groups");
        let engine = engine(principal, vec![g1()]);
        assert!(engine.check_access("page", "11").unwrap());
        assert!(engine.exclusion_set("page").unwrap().is_empty());
    }

    #[test]
    fn test_all_mode_group_never_denies() {
        let open = Group::new(4, "open")
            .with_access(AccessMode::All, AccessMode::All)
            .with_object(ObjectKind::ContentItem, "page", "10");
        let only_open = engine(StaticPrincipal::anonymous(), vec![open.clone()]);
        assert!(only_open.check_access("page", "11").unwrap());

        // An open group does not cancel a restricting one.
        let mixed = engine(StaticPrincipal::anonymous(), vec![open, g1()]);
        assert!(!mixed.check_access("page", "11").unwrap());
    }

    #[test]
    fn test_read_all_write_group() {
        let group = Group::new(5, "drafts")
            .with_access(AccessMode::All, AccessMode::Group)
            .with_object(ObjectKind::ContentItem, "post", "30");

        let viewer = engine(StaticPrincipal::user("bob"), vec![group.clone()]);
        assert!(viewer.check_access("post", "30").unwrap());
        assert!(
            !viewer
                .check_access_for("post", "30", AccessOperation::Write)
                .unwrap()
        );

        let editor = engine(StaticPrincipal::user("bob").in_admin_context(), vec![group]);
        assert!(!editor.check_access("post", "30").unwrap());
    }
}

// =============================================================================
// 3. Explanations
// =============================================================================

mod explanations {
    use super::*;

    #[test]
    fn test_explain_member_via_role() {
        let group = Group::new(2, "G2")
            .with_object(ObjectKind::Role, "role", "editor")
            .with_object(ObjectKind::ContentItem, "page", "10");
        let engine = engine(StaticPrincipal::user("alice"), vec![group]);

        let explanation = engine
            .explain_access("page", "12", AccessOperation::Read)
            .unwrap();
        assert!(explanation.is_granted());
        assert_eq!(explanation.reason, DecisionReason::Member { group: 2 });

        let verdict = &explanation.groups[0];
        assert_eq!(verdict.name, "G2");
        assert_eq!(verdict.object_membership.sources(ObjectKind::ContentItem).count(), 1);
        match &verdict.outcome {
            GroupOutcome::Member { membership } => {
                assert_eq!(membership.sources(ObjectKind::Role).count(), 1);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_explain_denied_lists_restricting_groups() {
        let open = Group::new(4, "open")
            .with_access(AccessMode::All, AccessMode::All)
            .with_object(ObjectKind::ContentItem, "page", "10");
        let engine = engine(StaticPrincipal::user("bob"), vec![g1(), open]);

        let explanation = engine
            .explain_access("page", "11", AccessOperation::Read)
            .unwrap();
        assert_eq!(explanation.reason, DecisionReason::Denied);
        let outcomes: Vec<_> = explanation.groups.iter().map(|v| &v.outcome).collect();
        assert_eq!(outcomes, [&GroupOutcome::Restricted, &GroupOutcome::Unrestricted]);
    }

    #[test]
    fn test_explain_reason_names_first_granting_group() {
        let closed = Group::new(1, "closed").with_object(ObjectKind::ContentItem, "page", "10");
        let mut by_ip = g1();
        by_ip.id = 9;
        let engine = engine(StaticPrincipal::user("bob").with_ip("10.0.0.7"), vec![closed, by_ip]);

        let explanation = engine
            .explain_access("page", "11", AccessOperation::Read)
            .unwrap();
        assert_eq!(explanation.reason, DecisionReason::IpMatch { group: 9 });
        let outcomes: Vec<_> = explanation.groups.iter().map(|v| &v.outcome).collect();
        assert_eq!(outcomes, [&GroupOutcome::Restricted, &GroupOutcome::IpMatch]);
    }

    #[test]
    fn test_explain_serializes() {
        let engine = engine(StaticPrincipal::user("bob").with_ip("10.0.0.1"), vec![g1()]);
        let explanation = engine
            .explain_access("page", "10", AccessOperation::Read)
            .unwrap();
        let json = serde_json::to_value(&explanation).unwrap();
        assert_eq!(json["reason"]["reason"], "ip_match");
        assert_eq!(json["groups"][0]["outcome"]["outcome"], "ip_match");
        assert_eq!(json["operation"], "read");
    }
}

// =============================================================================
// 4. Exclusion sets
// =============================================================================

mod exclusion {
    use super::*;

    #[test]
    fn test_excluded_ancestor_excludes_descendants() {
        let engine = engine(StaticPrincipal::user("bob"), vec![g1()]);
        assert_eq!(engine.exclusion_set("page").unwrap(), ids(&["10", "11", "12"]));
        assert!(engine.exclusion_set("post").unwrap().is_empty());
    }

    #[test]
    fn test_general_category_covers_all_subtypes() {
        let group = g1().with_object(ObjectKind::ContentItem, "post", "30");
        let engine = engine(StaticPrincipal::user("bob"), vec![group]);
        assert_eq!(
            engine.exclusion_set("content_item").unwrap(),
            ids(&["10", "11", "12", "30"])
        );
        assert_eq!(engine.exclusion_set("post").unwrap(), ids(&["30"]));
    }

    #[test]
    fn test_items_through_terms_are_excluded() {
        let group = Group::new(3, "newsroom").with_object(ObjectKind::Term, "category", "news");
        let engine = engine(StaticPrincipal::user("bob"), vec![group]);
        assert_eq!(engine.exclusion_set("post").unwrap(), ids(&["20"]));
        assert_eq!(engine.exclusion_set("category").unwrap(), ids(&["local", "news"]));
    }

    #[test]
    fn test_tagged_item_without_hierarchy_row() {
        let repo = MemoryRepository::new()
            .with_term("news", None, "category")
            .with_subtype(ObjectKind::ContentItem, "40", "post")
            .with_link("40", "news")
            .with_link("41", "news");
        let group = Group::new(1, "newsroom").with_object(ObjectKind::Term, "category", "news");
        let engine = engine_with(&AppConfig::default(), repo, StaticPrincipal::user("bob"), vec![group]);

        let posts = engine.exclusion_set("post").unwrap();
        assert_eq!(posts, ids(&["40", "41"]));
        assert_eq!(engine.exclusion_set("attachment").unwrap(), ids(&["41"]));
        for id in ["40", "41"] {
            assert!(!engine.check_access("post", id).unwrap(), "item {id}");
        }
    }

    #[test]
    fn test_passing_group_lifts_exclusion() {
        let member_group = Group::new(6, "editors")
            .with_object(ObjectKind::Role, "role", "editor")
            .with_object(ObjectKind::ContentItem, "page", "11");
        let engine = engine(StaticPrincipal::user("alice"), vec![g1(), member_group]);
        assert_eq!(engine.exclusion_set("page").unwrap(), ids(&["10"]));
    }

    #[test]
    fn test_owned_objects_not_excluded() {
        let repo = site().with_owner(ObjectKind::ContentItem, "12", "bob");
        let engine = engine_with(&AppConfig::default(), repo, StaticPrincipal::user("bob"), vec![g1()]);
        assert_eq!(engine.exclusion_set("page").unwrap(), ids(&["10", "11"]));
    }

    #[test]
    fn test_exclusion_agrees_with_check_access() {
        let group = Group::new(3, "newsroom")
            .with_object(ObjectKind::Term, "category", "news")
            .with_object(ObjectKind::ContentItem, "page", "11");
        let engine = engine(StaticPrincipal::user("bob"), vec![group, g1()]);
        let excluded = engine.exclusion_set("content_item").unwrap();

        for id in ["10", "11", "12", "20", "30"] {
            assert_eq!(
                engine.check_access("content_item", id).unwrap(),
                !excluded.contains(id),
                "item {id}"
            );
        }
    }
}

// =============================================================================
// 5. Group listings and lifecycle
// =============================================================================

mod groups {
    use super::*;

    #[test]
    fn test_groups_for_object_is_direct_only() {
        let engine = engine(StaticPrincipal::user("bob"), vec![g1()]);
        let owning = engine.groups_for_object("page", "10", false).unwrap();
        assert_eq!(owning.len(), 1);
        assert!(engine.groups_for_object("page", "11", false).unwrap().is_empty());
        assert!(engine.groups_for_object("comment", "10", false).unwrap().is_empty());
    }

    #[test]
    fn test_groups_for_object_filtered_to_principal() {
        let mut config = AppConfig::default();
        config.policy.restrict_groups_to_member = true;
        let editors = Group::new(6, "editors")
            .with_object(ObjectKind::Role, "role", "editor")
            .with_object(ObjectKind::ContentItem, "page", "10");

        let alice = engine_with(&config, site(), StaticPrincipal::user("alice"), vec![g1(), editors.clone()]);
        let visible: Vec<_> = alice
            .groups_for_object("page", "10", true)
            .unwrap()
            .iter()
            .map(|g| g.id)
            .collect();
        assert_eq!(visible, [6]);
        assert_eq!(alice.groups_for_object("page", "10", false).unwrap().len(), 2);
        assert_eq!(alice.visible_groups().unwrap().len(), 1);

        let manager = StaticPrincipal::user("bob").with_capability("manage_user_groups");
        let manager = engine_with(&config, site(), manager, vec![g1(), editors]);
        assert_eq!(manager.groups_for_object("page", "10", true).unwrap().len(), 2);
    }

    #[test]
    fn test_lifecycle_invalidates_decisions() {
        let mut engine = engine(StaticPrincipal::user("bob"), vec![]);
        assert!(engine.check_access("page", "11").unwrap());

        let added = engine.add_group(g1()).unwrap();
        assert!(!engine.check_access("page", "11").unwrap());
        assert_eq!(engine.groups().unwrap().len(), 1);

        let mut updated = added.clone();
        updated.add_object(ObjectKind::User, "user", "bob");
        engine.update_group(updated).unwrap();
        assert!(engine.check_access("page", "11").unwrap());

        engine.delete_group(added.id).unwrap();
        assert!(engine.group(added.id).unwrap().is_none());
        assert!(engine.check_access("page", "11").unwrap());
    }

    #[test]
    fn test_lifecycle_errors_propagate() {
        let mut engine = engine(StaticPrincipal::user("bob"), vec![]);
        assert!(engine.delete_group(42).is_err());
        assert!(engine.add_group(Group::new(0, "")).is_err());
    }

    #[test]
    fn test_group_members_and_display_name() {
        let repo = site().with_name(ObjectKind::ContentItem, "10", "About");
        let engine = engine_with(&AppConfig::default(), repo, StaticPrincipal::anonymous(), vec![g1()]);

        let direct = engine.group_members(1, "page", false).unwrap();
        let all = engine.group_members(1, "page", true).unwrap();
        assert_eq!(direct.len(), 1);
        assert_eq!(all.len(), 3);
        assert!(engine.group_members(99, "page", true).unwrap().is_empty());

        assert_eq!(
            engine.display_name("page", "10").unwrap(),
            Some(("About".to_string(), "Content".to_string()))
        );
        assert_eq!(engine.display_name("comment", "1").unwrap(), None);
    }
}

// =============================================================================
// 6. Shared cache
// =============================================================================

mod shared_cache {
    use super::*;

    fn cached_engine(cache: Arc<MemoryCache>, repo: MemoryRepository) -> AccessEngine {
        AccessEngine::builder(&AppConfig::default())
            .repository(Arc::new(repo))
            .principal(Arc::new(StaticPrincipal::user("bob")))
            .group_store(Arc::new(MemoryGroupStore::with_groups([g1()])))
            .cache(cache)
            .build()
            .unwrap()
    }

    #[test]
    fn test_revision_change_rebuilds_closures() {
        let cache = Arc::new(MemoryCache::new());
        assert!(!cached_engine(cache.clone(), site()).check_access("page", "12").unwrap());
        let entries = cache.len();

        let moved = site().with_item("12", None, "page").with_revision(1);
        let engine = cached_engine(cache.clone(), moved);
        assert!(engine.check_access("page", "12").unwrap());
        assert_eq!(cache.len(), entries * 2);
    }

    #[test]
    fn test_disabled_cache_is_ignored() {
        let mut config = AppConfig::default();
        config.cache.enabled = false;
        let cache = Arc::new(MemoryCache::new());
        let engine = AccessEngine::builder(&config)
            .repository(Arc::new(site()))
            .principal(Arc::new(StaticPrincipal::user("bob")))
            .group_store(Arc::new(MemoryGroupStore::with_groups([g1()])))
            .cache(cache.clone())
            .build()
            .unwrap();

        assert!(!engine.check_access("page", "11").unwrap());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_failing_cache_matches_uncached() {
        let failing = AccessEngine::builder(&AppConfig::default())
            .repository(Arc::new(site()))
            .principal(Arc::new(StaticPrincipal::user("bob")))
            .group_store(Arc::new(MemoryGroupStore::with_groups([g1()])))
            .cache(Arc::new(MemoryCache::failing()))
            .build()
            .unwrap();
        let plain = engine(StaticPrincipal::user("bob"), vec![g1()]);

        for id in ["10", "11", "12", "20", "30"] {
            assert_eq!(
                failing.check_access("page", id).unwrap(),
                plain.check_access("page", id).unwrap()
            );
        }
    }
}
