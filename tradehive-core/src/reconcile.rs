use crate::manager::AgentManager;
use tradehive_persistence::AgentStatus;

/// Corrects persisted status against the manager's observed liveness (§4.6, §6.1). Belongs to
/// the (out-of-scope) external interface layer's "get by id" handler, which is expected to
/// call this and apply the result via `Store::update_agent_status`. Returns `None` when the
/// persisted status already agrees with what the manager observes.
pub fn reconcile(
    persisted_status: AgentStatus,
    manager: &AgentManager,
    agent_id: i64,
) -> Option<(AgentStatus, String)> {
    let running = manager.is_agent_running(agent_id);

    match (persisted_status, running) {
        (AgentStatus::Running, false) => Some((
            AgentStatus::Error,
            "process not found by manager".to_string(),
        )),
        (status, true) if status != AgentStatus::Running => Some((
            AgentStatus::Running,
            "status corrected from manager state".to_string(),
        )),
        _ => None,
    }
}
