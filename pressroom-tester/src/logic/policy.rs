use std::cmp::Reverse;
use std::fmt;

use pressroom_game::pipeline::DEPARTMENT_COUNT;
use pressroom_game::{Advance, DepartmentId, GameSession, Order};

/// Drive kept in hand before a policy accepts more work.
const DRIVE_RESERVE: f64 = 5.0;
/// Money kept in hand after hiring.
const MONEY_RESERVE: i64 = 150;
/// Orders a manual player keeps in flight at once.
const MAX_ACTIVE: usize = 6;

/// What a policy did during one call to [`PlayerPolicy::act`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct PolicyActions {
    pub accepted: u32,
    pub processed: u32,
    pub hired_workers: u32,
    pub hired_managers: u32,
    pub rejected: u32,
}

impl PolicyActions {
    pub const fn absorb(&mut self, other: Self) {
        self.accepted += other.accepted;
        self.processed += other.processed;
        self.hired_workers += other.hired_workers;
        self.hired_managers += other.hired_managers;
        self.rejected += other.rejected;
    }
}

/// Policy interface for automated play strategies.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Issue commands against the session after a tick.
    fn act(&mut self, session: &mut GameSession) -> PolicyActions;
}

/// Built-in gameplay strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum GameplayStrategy {
    /// Never touches the shop; only the clock moves.
    Idle,
    /// Accepts and pushes every order by hand.
    Hustler,
    /// Hires workers and staffs the busiest departments.
    Staffer,
    /// Buys a manager first and lets it pick orders.
    Delegator,
}

impl GameplayStrategy {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Hustler => "Hustler",
            Self::Staffer => "Staffer",
            Self::Delegator => "Delegator",
        }
    }

    #[must_use]
    pub fn create_policy(self) -> Box<dyn PlayerPolicy> {
        match self {
            Self::Idle => Box::new(IdlePolicy),
            Self::Hustler => Box::new(HustlerPolicy),
            Self::Staffer => Box::new(StafferPolicy),
            Self::Delegator => Box::new(DelegatorPolicy::default()),
        }
    }
}

impl fmt::Display for GameplayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

struct IdlePolicy;
struct HustlerPolicy;
struct StafferPolicy;

#[derive(Default)]
struct DelegatorPolicy {
    manager_bought: bool,
}

impl PlayerPolicy for IdlePolicy {
    fn name(&self) -> &'static str {
        "Idle"
    }

    fn act(&mut self, _session: &mut GameSession) -> PolicyActions {
        PolicyActions::default()
    }
}

impl PlayerPolicy for HustlerPolicy {
    fn name(&self) -> &'static str {
        "Hustler"
    }

    fn act(&mut self, session: &mut GameSession) -> PolicyActions {
        let mut actions = accept_best(session);
        actions.absorb(push_oldest_stage(session));
        actions
    }
}

impl PlayerPolicy for StafferPolicy {
    fn name(&self) -> &'static str {
        "Staffer"
    }

    fn act(&mut self, session: &mut GameSession) -> PolicyActions {
        let mut actions = hire_and_staff(session);
        actions.absorb(accept_best(session));
        actions
    }
}

impl PlayerPolicy for DelegatorPolicy {
    fn name(&self) -> &'static str {
        "Delegator"
    }

    fn act(&mut self, session: &mut GameSession) -> PolicyActions {
        let mut actions = PolicyActions::default();
        if !self.manager_bought {
            match session.hire_manager() {
                Ok(_) => {
                    self.manager_bought = true;
                    actions.hired_managers += 1;
                }
                Err(err) => {
                    log::trace!("delegator could not hire a manager yet: {err}");
                    actions.rejected += 1;
                }
            }
            return actions;
        }
        actions.absorb(hire_and_staff(session));
        actions
    }
}

/// Rank order: legendary first, then the larger reward.
fn best_order(orders: &[Order]) -> Option<&Order> {
    orders
        .iter()
        .min_by_key(|order| (order.rarity.rank(), Reverse(order.reward)))
}

fn accept_best(session: &mut GameSession) -> PolicyActions {
    let mut actions = PolicyActions::default();
    if !session.is_work_time() || session.active_orders().len() >= MAX_ACTIVE {
        return actions;
    }
    let cost = session.config().drive.actions_per_order;
    if session.resources().drive < cost + DRIVE_RESERVE {
        return actions;
    }
    let Some(id) = best_order(session.available_orders()).map(|order| order.id) else {
        return actions;
    };
    match session.accept_order(id) {
        Ok(()) => actions.accepted += 1,
        Err(err) => {
            log::debug!("accept of {id} rejected: {err}");
            actions.rejected += 1;
        }
    }
    actions
}

/// One manual step on the furthest-along non-empty department.
fn push_oldest_stage(session: &mut GameSession) -> PolicyActions {
    let mut actions = PolicyActions::default();
    if !session.is_work_time() || session.resources().drive < DRIVE_RESERVE {
        return actions;
    }
    let target = DepartmentId::all()
        .rev()
        .find(|dept| !session.department_queue(*dept).is_empty());
    let Some(dept) = target else {
        return actions;
    };
    match session.process_department(dept) {
        Ok(Advance::Moved { .. } | Advance::Completed(_)) => actions.processed += 1,
        Err(err) => {
            log::debug!("manual step in {dept} rejected: {err}");
            actions.rejected += 1;
        }
    }
    actions
}

fn hire_and_staff(session: &mut GameSession) -> PolicyActions {
    let mut actions = PolicyActions::default();
    let cost = session.config().staffing.worker_cost;
    let wanted = u32::try_from(DEPARTMENT_COUNT).unwrap_or(u32::MAX);
    if session.workforce().workers_hired() < wanted
        && session.resources().money >= cost + MONEY_RESERVE
    {
        match session.hire_worker() {
            Ok(_) => actions.hired_workers += 1,
            Err(err) => {
                log::debug!("worker hire rejected: {err}");
                actions.rejected += 1;
            }
        }
    }

    while session.workforce().free_workers() > 0 {
        let busiest = session
            .departments()
            .into_iter()
            .max_by_key(|view| (view.queued, Reverse(view.employees), Reverse(view.id)))
            .map(|view| view.id);
        let Some(dept) = busiest else {
            break;
        };
        if let Err(err) = session.assign_employee(dept) {
            log::debug!("assignment to {dept} rejected: {err}");
            actions.rejected += 1;
            break;
        }
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use pressroom_game::GameConfig;

    fn session(money: i64) -> GameSession {
        let cfg = GameConfig {
            starting_money: money,
            ..GameConfig::default()
        };
        GameSession::new(cfg, 4242).unwrap()
    }

    #[test]
    fn idle_policy_does_nothing() {
        let mut s = session(1_000);
        let before = s.resources().clone();
        let actions = GameplayStrategy::Idle.create_policy().act(&mut s);
        assert_eq!(actions, PolicyActions::default());
        assert_eq!(*s.resources(), before);
    }

    #[test]
    fn hustler_accepts_best_order_and_pushes_it() {
        let mut s = session(1_000);
        let expected = best_order(s.available_orders()).unwrap().id;
        let mut policy = GameplayStrategy::Hustler.create_policy();
        let actions = policy.act(&mut s);
        assert_eq!(actions.accepted, 1);
        assert_eq!(actions.processed, 1);
        assert_eq!(s.active_orders()[0].id, expected);
        assert_eq!(s.order_stage(expected), Some("Printing"));
    }

    #[test]
    fn staffer_hires_and_assigns_until_broke() {
        let mut s = session(1_200);
        let mut policy = GameplayStrategy::Staffer.create_policy();
        let mut total = PolicyActions::default();
        for _ in 0..3 {
            total.absorb(policy.act(&mut s));
        }
        assert_eq!(total.hired_workers, 2);
        assert_eq!(s.workforce().free_workers(), 0);
        assert_eq!(s.workforce().assigned_total(), 2);
        assert!(s.resources().money >= MONEY_RESERVE);
    }

    #[test]
    fn delegator_buys_manager_first() {
        let mut s = session(900);
        let mut policy = GameplayStrategy::Delegator.create_policy();
        let actions = policy.act(&mut s);
        assert_eq!(actions.hired_managers, 1);
        assert_eq!(s.workforce().managers(), 1);
        assert_eq!(s.workforce().workers_hired(), 0);
    }

    #[test]
    fn policy_names_match_labels() {
        use GameplayStrategy::{Delegator, Hustler, Idle, Staffer};
        for strategy in [Idle, Hustler, Staffer, Delegator] {
            assert_eq!(strategy.create_policy().name(), strategy.label());
        }
    }
}
