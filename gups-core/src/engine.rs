//! Reviewer assignment engine
//!
//! Given a rule name and a pull request snapshot, the engine decides who has
//! to be newly asked for a review, whose approval is still missing and
//! whether the pull request can be merged. It never mutates its tables, so a
//! single [`Engine`] can be shared between tasks behind an `Arc`.

use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::pull_request::PullRequest;
use crate::rules::{Directive, Dispatch, PoolRegistry, RuleTable};
use crate::set::Set;
use crate::{Error, Result};

/// Outcome of evaluating one pull request against one rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Assignment {
    /// Reviewers picked in this run who were not engaged before
    pub new: Set,
    /// Assigned reviewers who have not approved yet
    pub pending: Set,
    /// Everyone responsible for the pull request under the matched rule
    pub assigned: Set,
    /// Explicitly requested reviewers that fall outside `assigned`
    pub requested: Set,
    /// Every quota is covered by approvals and nobody new had to be picked
    pub ready: bool,
}

impl Assignment {
    /// Whether the engine had nothing to say about this pull request
    pub fn is_empty(&self) -> bool {
        self.new.is_empty()
            && self.pending.is_empty()
            && self.assigned.is_empty()
            && self.requested.is_empty()
            && !self.ready
    }
}

/// Stateless evaluator over validated pools and rules
#[derive(Debug, Clone)]
pub struct Engine {
    pools: PoolRegistry,
    rules: RuleTable,
    skip_labels: Set,
    dispatch: Dispatch,
}

impl Engine {
    pub fn new(pools: PoolRegistry, rules: RuleTable, skip_labels: Set) -> Self {
        Self {
            pools,
            rules,
            skip_labels,
            dispatch: Dispatch::default(),
        }
    }

    /// Select how directives within a rule are matched
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn pools(&self) -> &PoolRegistry {
        &self.pools
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn skip_labels(&self) -> &Set {
        &self.skip_labels
    }

    pub fn dispatch(&self) -> Dispatch {
        self.dispatch
    }

    /// Evaluate `rule_name` against `pr` using the thread-local generator
    pub fn apply(&self, rule_name: &str, pr: &PullRequest) -> Result<Assignment> {
        self.apply_with_rng(rule_name, pr, &mut rand::rng())
    }

    /// Evaluate `rule_name` against `pr`, drawing new reviewers from `rng`
    ///
    /// Fails only when `rule_name` is not in the rule table, which means the
    /// caller did not take it from validated configuration.
    pub fn apply_with_rng<R: Rng + ?Sized>(
        &self,
        rule_name: &str,
        pr: &PullRequest,
        rng: &mut R,
    ) -> Result<Assignment> {
        let directives = self
            .rules
            .get(rule_name)
            .ok_or_else(|| Error::UnknownRule(rule_name.to_string()))?;

        let skipped = pr.labels.intersect(&self.skip_labels);
        if !skipped.is_empty() {
            debug!(pr = pr.number, labels = %skipped, "Skipping labelled pull request");
            return Ok(Assignment::default());
        }

        let reviewed = pr.reviewed();
        let engaged = pr.engaged();

        let mut author = Set::new();
        author.insert(pr.author.as_str());

        let mut result = Assignment::default();

        for directive in self.matching(directives, &pr.author) {
            debug!(
                pr = pr.number,
                guard = ?directive.guard,
                author = %pr.author,
                "Applying directive"
            );

            for pick in &directive.picks {
                let Some(pool) = self.pools.get(&pick.pool) else {
                    continue;
                };

                let active = pool.intersect(&engaged).difference(&author);
                let mut assigned = active.clone();

                debug!(pool = %pick.pool, members = %pool, active = %active, "Evaluating pick");

                let missing = pick.count.saturating_sub(active.len());
                if missing > 0 {
                    let candidates = pool.difference(&active.union(&author));
                    let picked = candidates.sample(missing, rng);
                    debug!(pool = %pick.pool, picked = %picked, missing, "Picked reviewers");
                    assigned.extend_from(&picked);
                    result.new.extend_from(&picked);
                }

                result.pending.extend_from(&assigned.difference(&reviewed));
                result.assigned.extend_from(&assigned);
            }
        }

        result.requested = pr.review_requests.difference(&result.assigned);
        result.ready = result.new.is_empty() && result.pending.is_empty();

        Ok(result)
    }

    /// Directives of a rule that apply to `author`, under the configured dispatch
    fn matching<'a>(
        &'a self,
        directives: &'a [Directive],
        author: &'a str,
    ) -> impl Iterator<Item = &'a Directive> + 'a {
        let limit = match self.dispatch {
            Dispatch::FirstMatch => 1,
            Dispatch::AllMatching => usize::MAX,
        };

        directives
            .iter()
            .filter(move |directive| directive.matches(author, &self.pools))
            .take(limit)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{DateTime, TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::pull_request::{Review, ReviewState};
    use crate::rules::DirectiveConfig;

    fn engine(
        pools: &[(&str, &[&str])],
        rules: &[(&str, &[(Option<&str>, &[&str])])],
    ) -> Engine {
        let users: Set = ["u1", "u2", "u3", "u4", "u5"].into_iter().collect();
        let pools = PoolRegistry::new(
            pools
                .iter()
                .map(|(name, members)| (*name, members.iter().copied().collect::<Set>())),
            &users,
        )
        .unwrap();

        let raw: BTreeMap<String, Vec<DirectiveConfig>> = rules
            .iter()
            .map(|(name, directives)| {
                let directives = directives
                    .iter()
                    .map(|(guard, picks)| DirectiveConfig {
                        guard: guard.map(str::to_string),
                        pick: picks.iter().map(|p| p.to_string()).collect(),
                    })
                    .collect();
                (name.to_string(), directives)
            })
            .collect();

        let rules = RuleTable::new(&raw, &pools).unwrap();
        Engine::new(pools, rules, Set::from(["wip"]))
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, minute, 0).unwrap()
    }

    struct PrBuilder {
        pr: PullRequest,
    }

    fn pr(title: &str, author: &str) -> PrBuilder {
        PrBuilder {
            pr: PullRequest::new(1, title, author),
        }
    }

    impl PrBuilder {
        fn review(mut self, user: &str, approved: bool) -> Self {
            let state = if approved {
                ReviewState::Approved
            } else {
                ReviewState::ChangesRequested
            };
            let minute = self.pr.reviews.len() as u32;
            self.pr.reviews.push(Review {
                author: user.to_string(),
                state,
                submitted_at: at(minute),
            });
            self
        }

        fn request(mut self, user: &str) -> Self {
            self.pr.review_requests.insert(user);
            self
        }

        fn label(mut self, label: &str) -> Self {
            self.pr.labels.insert(label);
            self
        }
    }

    #[derive(Default)]
    struct Expect<'a> {
        new: &'a [&'a str],
        pending: &'a [&'a str],
        assigned: &'a [&'a str],
        requested: &'a [&'a str],
        ready: bool,
    }

    fn check(engine: &Engine, rule: &str, pr: PrBuilder, expect: Expect<'_>) {
        let mut rng = StdRng::seed_from_u64(0);
        let result = engine.apply_with_rng(rule, &pr.pr, &mut rng).unwrap();
        let title = &pr.pr.title;

        let set = |items: &[&str]| items.iter().copied().collect::<Set>();
        assert_eq!(result.new, set(expect.new), "{title}-new");
        assert_eq!(result.pending, set(expect.pending), "{title}-pending");
        assert_eq!(result.assigned, set(expect.assigned), "{title}-assigned");
        assert_eq!(result.requested, set(expect.requested), "{title}-requested");
        assert_eq!(result.ready, expect.ready, "{title}-ready");
    }

    #[test]
    fn test_basics() {
        let engine = engine(&[("p1", &["u1", "u2"])], &[("r1", &[(None, &["p1"])])]);

        check(
            &engine,
            "r1",
            pr("pr1", "u1"),
            Expect {
                new: &["u2"],
                pending: &["u2"],
                assigned: &["u2"],
                ..Expect::default()
            },
        );
        check(
            &engine,
            "r1",
            pr("pr2", "u1").request("u2"),
            Expect {
                pending: &["u2"],
                assigned: &["u2"],
                ..Expect::default()
            },
        );
        check(
            &engine,
            "r1",
            pr("pr3", "u1").review("u2", true),
            Expect {
                assigned: &["u2"],
                ready: true,
                ..Expect::default()
            },
        );
        // A rejection without an open request does not count as engagement
        check(
            &engine,
            "r1",
            pr("pr4", "u1").review("u2", false),
            Expect {
                new: &["u2"],
                pending: &["u2"],
                assigned: &["u2"],
                ..Expect::default()
            },
        );
        check(
            &engine,
            "r1",
            pr("pr5", "u1").review("u2", false).review("u2", true),
            Expect {
                assigned: &["u2"],
                ready: true,
                ..Expect::default()
            },
        );
        check(
            &engine,
            "r1",
            pr("pr6", "u1").request("u2").review("u2", true),
            Expect {
                assigned: &["u2"],
                ready: true,
                ..Expect::default()
            },
        );
        check(
            &engine,
            "r1",
            pr("pr7", "u1").request("u2").review("u2", false),
            Expect {
                pending: &["u2"],
                assigned: &["u2"],
                ..Expect::default()
            },
        );
    }

    #[test]
    fn test_revocation_puts_reviewer_back_to_pending() {
        let engine = engine(&[("p1", &["u1", "u2"])], &[("r1", &[(None, &["p1"])])]);
        let revoked = pr("revoked", "u1")
            .request("u2")
            .review("u2", true)
            .review("u2", false);

        check(
            &engine,
            "r1",
            revoked,
            Expect {
                pending: &["u2"],
                assigned: &["u2"],
                ..Expect::default()
            },
        );
    }

    #[test]
    fn test_count() {
        let engine = engine(
            &[("p1", &["u1", "u2", "u3"])],
            &[("r1", &[(None, &["p1:2"])]), ("r2", &[(None, &["p1:3"])])],
        );

        check(
            &engine,
            "r1",
            pr("pr1", "u1"),
            Expect {
                new: &["u2", "u3"],
                pending: &["u2", "u3"],
                assigned: &["u2", "u3"],
                ..Expect::default()
            },
        );
        // Under-populated pool is filled as far as possible
        check(
            &engine,
            "r2",
            pr("pr2", "u1"),
            Expect {
                new: &["u2", "u3"],
                pending: &["u2", "u3"],
                assigned: &["u2", "u3"],
                ..Expect::default()
            },
        );
        check(
            &engine,
            "r1",
            pr("pr3", "u1").review("u2", true),
            Expect {
                new: &["u3"],
                pending: &["u3"],
                assigned: &["u2", "u3"],
                ..Expect::default()
            },
        );
    }

    #[test]
    fn test_conditions() {
        let engine = engine(
            &[("p1", &["u1"]), ("p2", &["u2"]), ("p3", &["u3"])],
            &[("r1", &[(Some("p1"), &["p2"]), (None, &["p3"])])],
        );

        check(
            &engine,
            "r1",
            pr("pr1", "u1"),
            Expect {
                new: &["u2"],
                pending: &["u2"],
                assigned: &["u2"],
                ..Expect::default()
            },
        );
        check(
            &engine,
            "r1",
            pr("pr2", "u2"),
            Expect {
                new: &["u3"],
                pending: &["u3"],
                assigned: &["u3"],
                ..Expect::default()
            },
        );
        // The only candidate is the author, so nobody can be picked
        check(
            &engine,
            "r1",
            pr("pr3", "u3"),
            Expect {
                ready: true,
                ..Expect::default()
            },
        );
        // Authors outside the user registry fall through to the default
        check(
            &engine,
            "r1",
            pr("pr4", "outsider"),
            Expect {
                new: &["u3"],
                pending: &["u3"],
                assigned: &["u3"],
                ..Expect::default()
            },
        );
    }

    #[test]
    fn test_all_matching_dispatch() {
        let engine = engine(
            &[("p1", &["u1"]), ("p2", &["u2"]), ("p3", &["u3"])],
            &[("r1", &[(Some("p1"), &["p2"]), (None, &["p3"])])],
        )
        .with_dispatch(Dispatch::AllMatching);

        check(
            &engine,
            "r1",
            pr("pr1", "u1"),
            Expect {
                new: &["u2", "u3"],
                pending: &["u2", "u3"],
                assigned: &["u2", "u3"],
                ..Expect::default()
            },
        );
        check(
            &engine,
            "r1",
            pr("pr2", "u2"),
            Expect {
                new: &["u3"],
                pending: &["u3"],
                assigned: &["u3"],
                ..Expect::default()
            },
        );
    }

    #[test]
    fn test_requested() {
        let engine = engine(
            &[("p1", &["u2"]), ("p2", &["u2", "u3"])],
            &[("r1", &[(None, &["p1"])]), ("r2", &[(None, &["p2"])])],
        );

        check(
            &engine,
            "r1",
            pr("pr1", "u1").request("u3"),
            Expect {
                new: &["u2"],
                pending: &["u2"],
                assigned: &["u2"],
                requested: &["u3"],
                ..Expect::default()
            },
        );
        check(
            &engine,
            "r2",
            pr("pr2", "u1").request("u3"),
            Expect {
                pending: &["u3"],
                assigned: &["u3"],
                ..Expect::default()
            },
        );
        // Everyone already engaged from the pool stays assigned
        check(
            &engine,
            "r2",
            pr("pr3", "u1").request("u2").request("u3"),
            Expect {
                pending: &["u2", "u3"],
                assigned: &["u2", "u3"],
                ..Expect::default()
            },
        );
    }

    #[test]
    fn test_skip_label() {
        let engine = engine(&[("p1", &["u1", "u2"])], &[("r1", &[(None, &["p1"])])]);
        let reviewed = pr("wip2", "u1")
            .label("wip")
            .review("u2", true)
            .request("u3");

        check(&engine, "r1", pr("wip1", "u1").label("wip"), Expect::default());
        check(&engine, "r1", reviewed, Expect::default());
        check(
            &engine,
            "r1",
            pr("other", "u1").label("bug"),
            Expect {
                new: &["u2"],
                pending: &["u2"],
                assigned: &["u2"],
                ..Expect::default()
            },
        );
    }

    #[test]
    fn test_unknown_rule_is_an_error() {
        let engine = engine(&[("p1", &["u1", "u2"])], &[("r1", &[(None, &["p1"])])]);
        let err = engine.apply("nope", &pr("pr", "u1").pr).unwrap_err();
        assert!(matches!(err, Error::UnknownRule(ref rule) if rule == "nope"));
    }

    #[test]
    fn test_author_never_assigned() {
        let engine = engine(
            &[("p1", &["u1", "u2", "u3", "u4"])],
            &[("r1", &[(None, &["p1:4"])])],
        );

        for seed in 0..20 {
            let pr = pr("self", "u1").request("u1").review("u1", true).pr;
            let result = engine
                .apply_with_rng("r1", &pr, &mut StdRng::seed_from_u64(seed))
                .unwrap();
            assert!(!result.new.contains("u1"));
            assert!(!result.pending.contains("u1"));
            assert!(!result.assigned.contains("u1"));
            assert_eq!(result.assigned, Set::from(["u2", "u3", "u4"]));
        }
    }

    #[test]
    fn test_rerun_with_picks_requested_is_idempotent() {
        let engine = engine(
            &[("p1", &["u1", "u2", "u3", "u4", "u5"])],
            &[("r1", &[(None, &["p1:2"])])],
        );

        for seed in 0..20 {
            let mut snapshot = pr("rerun", "u1").pr;
            let first = engine
                .apply_with_rng("r1", &snapshot, &mut StdRng::seed_from_u64(seed))
                .unwrap();
            assert_eq!(first.new.len(), 2);

            // The caller requested the picks on the forge
            snapshot.review_requests.extend_from(&first.new);

            let second = engine
                .apply_with_rng("r1", &snapshot, &mut StdRng::seed_from_u64(seed + 100))
                .unwrap();
            assert!(second.new.is_empty());
            assert_eq!(second.assigned, first.assigned);
            assert_eq!(second.pending, first.new);
            assert!(second.requested.is_empty());
        }
    }

    #[test]
    fn test_assignment_is_empty() {
        assert!(Assignment::default().is_empty());
        let ready = Assignment {
            ready: true,
            ..Assignment::default()
        };
        assert!(!ready.is_empty());
    }
}
