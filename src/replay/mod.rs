/*!
 * Replay Projection
 * Reconstructs the simulator view at an earlier logical time
 *
 * Derived purely from a recorded snapshot: the timelines are the ground
 * truth for CPU/I-O occupancy, the event log is the single authority for
 * transition classification. Queue contents cannot be reconstructed, so
 * a projected view carries a warning note.
 */

use crate::core::types::{Tick, IDLE};
use crate::snapshot::StateSnapshot;

/// Highest logical time a snapshot can be projected to
pub fn replay_max(state: &StateSnapshot) -> Tick {
    let timeline_max = |len: usize| len.saturating_sub(1) as Tick;
    state
        .time
        .max(timeline_max(state.gantt.len()))
        .max(timeline_max(state.io_gantt.len()))
        .max(timeline_max(state.mem_gantt.len()))
}

/// Parse the `t=<n>:` prefix of an event-log line
fn parse_event_tick(line: &str) -> Option<Tick> {
    let rest = line.strip_prefix("t=")?;
    let end = rest.find(':')?;
    rest[..end].parse().ok()
}

/// Project a recorded snapshot onto logical time `t` (clamped to the
/// replayable range)
pub fn project(state: &StateSnapshot, t: Tick) -> StateSnapshot {
    let t = t.min(replay_max(state));
    let mut view = state.clone();

    let token_at = |timeline: &[String]| -> String {
        timeline
            .get(t as usize)
            .cloned()
            .unwrap_or_else(|| IDLE.to_string())
    };

    view.running = token_at(&state.gantt);
    view.io_active = token_at(&state.io_gantt);

    let truncate = |timeline: &[String]| -> Vec<String> {
        timeline[..timeline.len().min(t as usize + 1)].to_vec()
    };
    view.gantt = truncate(&state.gantt);
    view.io_gantt = truncate(&state.io_gantt);
    view.mem_gantt = truncate(&state.mem_gantt);
    view.memory.mem_gantt = view.mem_gantt.clone();

    // Transition records after t are dropped; untagged session notes stay
    view.event_log = state
        .event_log
        .iter()
        .filter(|line| parse_event_tick(line).map_or(true, |tick| tick <= t))
        .cloned()
        .collect();

    if t != state.time {
        view.event_log.insert(
            0,
            format!(
                "REPLAY t={t}: derived view; queue snapshots are latest-known only"
            ),
        );
    }
    view.time = t;
    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{Process, ProcessSpec};
    use crate::sched::{SchedConfig, Scheduler};

    fn recorded_state() -> StateSnapshot {
        let mut procs = Vec::new();
        for (pid, arrival, bursts) in
            [("P1", 0i64, vec![3i64, 2, 2]), ("P2", 0, vec![2])]
        {
            let spec = ProcessSpec {
                pid: pid.into(),
                arrival_time: arrival,
                bursts: Some(crate::process::BurstList::Flat(bursts)),
                ..Default::default()
            };
            procs.push(Process::from_spec(&spec, 4096).unwrap());
        }
        let mut sched = Scheduler::new(SchedConfig::default(), procs).unwrap();
        while !sched.done() {
            sched.tick();
        }
        StateSnapshot::from_scheduler(&sched)
    }

    #[test]
    fn test_round_trip_tokens() {
        let state = recorded_state();
        for t in 0..state.gantt.len() as Tick {
            let view = project(&state, t);
            assert_eq!(view.running, state.gantt[t as usize], "cpu token at {t}");
            assert_eq!(
                view.io_active, state.io_gantt[t as usize],
                "io token at {t}"
            );
        }
    }

    #[test]
    fn test_timelines_truncated() {
        let state = recorded_state();
        let view = project(&state, 2);
        assert_eq!(view.gantt.len(), 3);
        assert_eq!(view.io_gantt.len(), 3);
        assert_eq!(view.mem_gantt.len(), 3);
        assert_eq!(view.time, 2);
    }

    #[test]
    fn test_event_log_filtered_by_time() {
        let state = recorded_state();
        let view = project(&state, 1);
        for line in &view.event_log {
            if let Some(tick) = parse_event_tick(line) {
                assert!(tick <= 1, "late event retained: {line}");
            }
        }
    }

    #[test]
    fn test_warning_note_only_for_past_views() {
        let state = recorded_state();

        let past = project(&state, 0);
        assert!(past.event_log[0].starts_with("REPLAY"));

        let current = project(&state, state.time);
        assert!(!current
            .event_log
            .first()
            .map(|l| l.starts_with("REPLAY"))
            .unwrap_or(false));
    }

    #[test]
    fn test_out_of_range_clamped() {
        let state = recorded_state();
        let view = project(&state, 10_000);
        assert_eq!(view.time, replay_max(&state));
    }
}
