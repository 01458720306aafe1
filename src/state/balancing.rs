//! Greedy weight balancing of the unassigned pool across both teams.
//!
//! Players are taken heaviest first (ties keep insertion order). The first two seed
//! Team Alpha and Team Beta, every following player joins whichever side has received
//! less weight so far, Team Alpha winning exact ties. Only the pool is distributed:
//! players already on a roster stay where they are and do not count toward the running
//! totals.

use tracing::info;

use crate::state::{
    model::{Player, PlayerId, TeamId},
    workflow::Workflow,
};

/// Summary of a balancing pass.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceReport {
    /// Assignments in the order they were applied.
    pub assignments: Vec<(PlayerId, TeamId)>,
    /// Weight handed to Team Alpha by this pass.
    pub alpha_weight: f64,
    /// Weight handed to Team Beta by this pass.
    pub beta_weight: f64,
}

impl BalanceReport {
    /// Absolute difference between the weight each team received.
    pub fn weight_gap(&self) -> f64 {
        (self.alpha_weight - self.beta_weight).abs()
    }
}

/// Compute the assignment for `players` without touching any state.
pub fn plan_balanced_teams(players: &[Player]) -> BalanceReport {
    let mut ordered: Vec<&Player> = players.iter().collect();
    // `sort_by` is stable, so equal weights keep their insertion order.
    ordered.sort_by(|a, b| b.weight.total_cmp(&a.weight));

    let mut report = BalanceReport {
        assignments: Vec::with_capacity(ordered.len()),
        alpha_weight: 0.0,
        beta_weight: 0.0,
    };

    for (index, player) in ordered.into_iter().enumerate() {
        let team = match index {
            0 => TeamId::Alpha,
            1 => TeamId::Beta,
            _ if report.alpha_weight <= report.beta_weight => TeamId::Alpha,
            _ => TeamId::Beta,
        };
        match team {
            TeamId::Alpha => report.alpha_weight += player.weight,
            TeamId::Beta => report.beta_weight += player.weight,
        }
        report.assignments.push((player.id, team));
    }

    report
}

/// Distribute the whole pool across both teams. The pool is empty afterwards.
pub fn form_balanced_teams(workflow: &mut Workflow) -> BalanceReport {
    let report = plan_balanced_teams(workflow.pool());
    for (player_id, team) in &report.assignments {
        workflow.move_player_to_team(*player_id, *team);
    }

    info!(
        assigned = report.assignments.len(),
        alpha_weight = workflow.team(TeamId::Alpha).total_weight(),
        beta_weight = workflow.team(TeamId::Beta).total_weight(),
        "balanced teams formed"
    );
    report
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;

    fn pool_of(weights: &[f64]) -> Workflow {
        let mut workflow = Workflow::new();
        for (index, weight) in weights.iter().enumerate() {
            workflow
                .add_player(&format!("P{index}"), None, *weight)
                .unwrap();
        }
        workflow
    }

    fn roster_names(workflow: &Workflow, team: TeamId) -> Vec<String> {
        workflow
            .team(team)
            .players
            .iter()
            .map(|p| p.name.clone())
            .collect()
    }

    #[test]
    fn two_players_seed_one_team_each() {
        let mut workflow = Workflow::new();
        let a = workflow.add_player("A", None, 5.0).unwrap();
        let b = workflow.add_player("B", None, 3.0).unwrap();

        form_balanced_teams(&mut workflow);

        assert!(workflow.pool().is_empty());
        assert_eq!(
            workflow.team(TeamId::Alpha).players.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![a]
        );
        assert_eq!(
            workflow.team(TeamId::Beta).players.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![b]
        );
    }

    #[test]
    fn lighter_first_player_still_seeds_by_weight() {
        let mut workflow = Workflow::new();
        let light = workflow.add_player("light", None, 3.0).unwrap();
        let heavy = workflow.add_player("heavy", None, 5.0).unwrap();

        form_balanced_teams(&mut workflow);

        assert!(workflow.team(TeamId::Alpha).contains(heavy));
        assert!(workflow.team(TeamId::Beta).contains(light));
    }

    #[test]
    fn balancing_is_deterministic() {
        let weights = [9.0, 9.0, 8.0, 8.0, 7.0, 7.0, 7.0, 6.0, 6.0, 6.0, 5.0, 5.0];

        let mut first = pool_of(&weights);
        form_balanced_teams(&mut first);
        let mut second = pool_of(&weights);
        form_balanced_teams(&mut second);

        for team in TeamId::ALL {
            assert_eq!(roster_names(&first, team), roster_names(&second, team));
            assert_eq!(first.team(team).total_weight(), second.team(team).total_weight());
        }
        assert_eq!(first.team(TeamId::Alpha).total_weight(), 42.0);
        assert_eq!(first.team(TeamId::Beta).total_weight(), 41.0);
        assert_eq!(
            roster_names(&first, TeamId::Alpha),
            vec!["P0", "P2", "P4", "P6", "P9", "P11"]
        );
    }

    #[test]
    fn equal_weights_keep_insertion_order() {
        let mut workflow = pool_of(&[4.0, 4.0, 4.0, 4.0]);
        form_balanced_teams(&mut workflow);
        assert_eq!(roster_names(&workflow, TeamId::Alpha), vec!["P0", "P2"]);
        assert_eq!(roster_names(&workflow, TeamId::Beta), vec!["P1", "P3"]);
    }

    #[test]
    fn gap_never_exceeds_heaviest_player() {
        let mut rng = StdRng::seed_from_u64(2024);
        for _ in 0..200 {
            let count = rng.random_range(2..30);
            let weights: Vec<f64> = (0..count).map(|_| rng.random_range(1.0..100.0)).collect();
            let heaviest = weights.iter().copied().fold(0.0, f64::max);

            let mut workflow = pool_of(&weights);
            let report = form_balanced_teams(&mut workflow);

            assert!(report.weight_gap() <= heaviest + 1e-9);
            assert!(workflow.pool().is_empty());
            let ids: HashSet<_> = workflow.player_ids().collect();
            assert_eq!(ids.len(), count);
        }
    }

    #[test]
    fn rostered_players_are_left_alone() {
        let mut workflow = pool_of(&[10.0, 2.0, 1.0]);
        let fixed = workflow.pool()[0].id;
        workflow.move_player_to_team(fixed, TeamId::Beta);

        let report = form_balanced_teams(&mut workflow);

        assert_eq!(report.assignments.len(), 2);
        assert!(workflow.team(TeamId::Beta).contains(fixed));
        assert_eq!(roster_names(&workflow, TeamId::Alpha), vec!["P1"]);
        assert_eq!(roster_names(&workflow, TeamId::Beta), vec!["P0", "P2"]);
    }

    #[test]
    fn empty_pool_is_a_noop() {
        let mut workflow = Workflow::new();
        let report = form_balanced_teams(&mut workflow);
        assert!(report.assignments.is_empty());
        assert_eq!(workflow, Workflow::new());
    }
}
