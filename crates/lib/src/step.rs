//! Logged steps around units of work.

use std::fmt::Display;
use std::future::Future;
use std::time::Instant;

use tracing::{Instrument, info, info_span, warn};

/// Run `work` inside a step named `label`.
///
/// Everything logged by `work` is scoped to the step's span. The step only
/// observes: the result is returned unchanged.
pub async fn run_step<F, T, E>(label: &str, work: F) -> Result<T, E>
where
  F: Future<Output = Result<T, E>>,
  E: Display,
{
  let span = info_span!("step", label = %label);
  async move {
    let start = Instant::now();
    info!("{}", label);

    let result = work.await;

    match &result {
      Ok(_) => info!(elapsed = ?start.elapsed(), "{} done", label),
      Err(err) => warn!(elapsed = ?start.elapsed(), error = %err, "{} failed", label),
    }
    result
  }
  .instrument(span)
  .await
}
