// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Invariants over arbitrary queues

use super::*;
use arq_core::test_support::strategies::arb_priorities;
use proptest::prelude::*;

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(future)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn active_executions_never_exceed_the_cap(
        priorities in arb_priorities(24),
        cap in 1usize..6,
        sweeps in 1usize..4,
    ) {
        let ctx = setup_with(RuntimeConfig { max_concurrent: cap, ..Default::default() });
        for priority in &priorities {
            ctx.submit(container_job().priority(*priority));
        }

        block_on(async {
            for _ in 0..sweeps {
                ctx.runtime.sweep().await;
            }
        });

        let (active, in_flight) =
            ctx.runtime.store().read(|s| (s.active_count(), s.in_flight_count()));
        prop_assert!(active <= cap);
        prop_assert!(in_flight <= cap);
        prop_assert_eq!(active, priorities.len().min(cap));
    }

    #[test]
    fn first_claim_goes_to_the_best_priority(priorities in arb_priorities(12)) {
        let ctx = setup_with(RuntimeConfig { max_concurrent: 1, ..Default::default() });
        let ids: Vec<ExecutionId> = priorities
            .iter()
            .map(|p| {
                ctx.clock.advance(Duration::from_millis(1));
                ctx.submit(container_job().priority(*p))
            })
            .collect();

        block_on(ctx.runtime.sweep());

        let best = priorities.iter().min().copied().unwrap();
        let first_best = priorities.iter().position(|p| *p == best).unwrap();
        prop_assert_eq!(ctx.status(&ids[first_best]), ExecutionStatus::Running);
    }

    #[test]
    fn attempts_stay_within_budget(failures in 1usize..8) {
        let ctx = setup();
        for i in 0..failures {
            ctx.containers.fail_next_launch(format!("failure {i}"));
        }
        let id = ctx.submit(container_job());

        block_on(async {
            for _ in 0..failures + 1 {
                ctx.runtime.sweep().await;
            }
        });

        let exe = ctx.exe(&id);
        prop_assert!(exe.attempts <= 3);
        prop_assert!(ctx.containers.run_count() <= 3);
        if failures >= 3 {
            prop_assert_eq!(exe.status, ExecutionStatus::Failed);
        } else {
            prop_assert_eq!(exe.status, ExecutionStatus::Running);
        }
    }
}
