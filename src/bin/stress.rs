//! Stress harness for SnapList
//!
//! Writers move units between slots with `update`, so the total across all
//! slots never changes. They also churn the tail by pushing a zero and then
//! dropping the last element, so the slots themselves are never shifted.
//! Readers keep taking snapshots and check:
//! 1. Conservation: every snapshot sums to the starting total
//! 2. Shape: the slots are intact and everything past them is zero
//! 3. Stability: walking the same snapshot twice yields the same elements
//!
//! Usage: stress [threads] [rounds]
//! Log level comes from RUST_LOG (default `info`).

use std::process::exit;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

use rand::Rng;
use snaplist::{Config, Error, PersistentSeq, SnapList};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const SLOTS: usize = 64;
const START: i64 = 1_000;

fn arg(position: usize, default: usize) -> usize {
    return std::env::args()
        .nth(position)
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default);
}

/// Move one unit from a random slot to another, if the source has any.
fn transfer(list: &SnapList<i64>, rng: &mut impl Rng) -> Result<(), Error> {
    let from = rng.gen_range(0..SLOTS);
    let to = rng.gen_range(0..SLOTS);
    return list.update(|seq| {
        let amount = *seq.get(from).ok_or_else(|| Error::out_of_range(from, seq.len()))?;
        if amount == 0 || from == to {
            return Ok(seq.clone());
        }
        let taken = seq.set_at(from, amount - 1)?;
        let target = *taken.get(to).ok_or_else(|| Error::out_of_range(to, taken.len()))?;
        return taken.set_at(to, target + 1);
    });
}

/// Push a zero, then drop whatever is last. Both steps leave the slots alone.
fn churn_tail(list: &SnapList<i64>) -> Result<(), Error> {
    list.push(0)?;
    return list.update(|seq| {
        let last = seq.len().checked_sub(1).ok_or_else(|| Error::out_of_range(0, 0))?;
        return seq.remove_at(last).map(|(next, _)| next);
    });
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let threads = arg(1, 8).max(2);
    let rounds = arg(2, 10_000);
    let total = START * SLOTS as i64;

    let list: SnapList<i64> = SnapList::from_seq(
        std::iter::repeat_n(START, SLOTS).collect(),
        Config::new().with_label("stress"),
    );
    let writers = threads / 2;
    let done = AtomicBool::new(false);
    let checked = AtomicUsize::new(0);
    let failed = AtomicBool::new(false);

    info!(threads, rounds, slots = SLOTS, total, "starting stress run");
    let start = Instant::now();

    thread::scope(|scope| {
        let write_handles: Vec<_> = (0..writers)
            .map(|_| {
                scope.spawn(|| {
                    let mut rng = rand::thread_rng();
                    for round in 0..rounds {
                        if let Err(err) = transfer(&list, &mut rng) {
                            error!(%err, round, "transfer failed");
                            failed.store(true, Ordering::Relaxed);
                            return;
                        }
                        if round % 16 == 0 {
                            if let Err(err) = churn_tail(&list) {
                                error!(%err, round, "tail churn failed");
                                failed.store(true, Ordering::Relaxed);
                                return;
                            }
                        }
                    }
                })
            })
            .collect();

        for _ in writers..threads {
            scope.spawn(|| {
                while !done.load(Ordering::Relaxed) {
                    let snapshot = list.snapshot();
                    let sum: i64 = snapshot.iter().sum();
                    if sum != total {
                        error!(sum, total, len = snapshot.len(), "snapshot total drifted");
                        failed.store(true, Ordering::Relaxed);
                        return;
                    }
                    if snapshot.len() < SLOTS || snapshot.iter().skip(SLOTS).any(|value| *value != 0) {
                        error!(len = snapshot.len(), "slots shifted by tail churn");
                        failed.store(true, Ordering::Relaxed);
                        return;
                    }
                    if !snapshot.iter().eq(snapshot.iter()) {
                        error!(len = snapshot.len(), "snapshot changed while walking it");
                        failed.store(true, Ordering::Relaxed);
                        return;
                    }
                    checked.fetch_add(1, Ordering::Relaxed);
                }
            });
        }

        for handle in write_handles {
            if handle.join().is_err() {
                error!("writer thread panicked");
                failed.store(true, Ordering::Relaxed);
            }
        }
        done.store(true, Ordering::Relaxed);
    });

    let final_sum: i64 = list.snapshot().iter().sum();
    if failed.load(Ordering::Relaxed) || final_sum != total {
        error!(final_sum, total, "stress run failed");
        exit(1);
    }

    info!(
        elapsed = ?start.elapsed(),
        snapshots_checked = checked.load(Ordering::Relaxed),
        len = list.len(),
        "stress run passed"
    );
}
