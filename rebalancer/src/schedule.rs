//! Daemon scheduling: daily rebalance, periodic monitoring, weekly review.
//!
//! All jobs run on the calling thread, one at a time. A failing job is
//! logged and the loop keeps going.

use std::time::Duration;

use ballast_broker::Venue;
use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Weekday};
use log::{error, info};

use crate::advisor::Advisor;
use crate::config::Config;
use crate::error::Result;
use crate::execution::Coordinator;
use crate::market::MarketData;
use crate::target;

/// How often the loop wakes up to look for due jobs.
pub const POLL_INTERVAL: Duration = Duration::from_secs(60);

/// A scheduled job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Rebalance,
    Monitor,
    Review,
}

/// Tracks when each job last ran and decides what is due.
#[derive(Debug, Clone)]
pub struct Schedule {
    rebalance_at: NaiveTime,
    monitor_every: TimeDelta,
    review_at: Option<(Weekday, NaiveTime)>,
    last_rebalance: Option<NaiveDate>,
    last_review: Option<NaiveDate>,
    next_monitor: NaiveDateTime,
}

impl Schedule {
    /// Start a schedule at `now`. Jobs whose time already passed today
    /// wait for their next occurrence.
    pub fn new(
        now: NaiveDateTime,
        rebalance_at: NaiveTime,
        monitor_every: TimeDelta,
        review_at: Option<(Weekday, NaiveTime)>,
    ) -> Self {
        let today = now.date();
        let last_rebalance = (now.time() >= rebalance_at).then_some(today);
        let last_review = review_at
            .filter(|(day, at)| now.weekday() == *day && now.time() >= *at)
            .map(|_| today);
        Self {
            rebalance_at,
            monitor_every,
            review_at,
            last_rebalance,
            last_review,
            next_monitor: now + monitor_every,
        }
    }

    pub fn from_config(config: &Config, now: NaiveDateTime, with_review: bool) -> Result<Self> {
        let review = if with_review {
            Some((config.review_weekday()?, config.review_time()?))
        } else {
            None
        };
        Ok(Self::new(
            now,
            config.rebalance_time()?,
            TimeDelta::minutes(config.schedule.monitor_interval_mins as i64),
            review,
        ))
    }

    /// Jobs due at `now`, marked as run. Review comes before rebalance so a
    /// new target is traded right away.
    pub fn due(&mut self, now: NaiveDateTime) -> Vec<Job> {
        let today = now.date();
        let mut jobs = Vec::new();

        if let Some((day, at)) = self.review_at {
            if now.weekday() == day && now.time() >= at && self.last_review != Some(today) {
                self.last_review = Some(today);
                jobs.push(Job::Review);
            }
        }
        if now.time() >= self.rebalance_at && self.last_rebalance != Some(today) {
            self.last_rebalance = Some(today);
            jobs.push(Job::Rebalance);
        }
        if now >= self.next_monitor {
            while self.next_monitor <= now {
                self.next_monitor += self.monitor_every;
            }
            // a rebalance this tick already covers drift
            if !jobs.contains(&Job::Rebalance) {
                jobs.push(Job::Monitor);
            }
        }
        jobs
    }
}

/// Run one job against the target file.
pub fn run_job<V: Venue, M: MarketData>(
    job: Job,
    coordinator: &mut Coordinator<V, M>,
    config: &Config,
    advisor: Option<&dyn Advisor>,
) -> Result<()> {
    let target_path = config.trading.target_file.as_path();
    let current = target::load(target_path)?;
    match job {
        Job::Rebalance => {
            info!("Starting scheduled portfolio rebalancing...");
            coordinator.rebalance(&current)?;
        }
        Job::Monitor => {
            coordinator.monitor(&current)?;
        }
        Job::Review => {
            if let Some(advisor) = advisor {
                coordinator.review(advisor, &current, target_path, &config.advisor)?;
            }
        }
    }
    Ok(())
}

/// Run an initial cycle, then serve the schedule until the process ends.
pub fn run_daemon<V: Venue, M: MarketData>(
    coordinator: &mut Coordinator<V, M>,
    config: &Config,
    advisor: Option<&dyn Advisor>,
) -> Result<()> {
    let mut schedule = Schedule::from_config(config, Local::now().naive_local(), advisor.is_some())?;
    info!(
        "Scheduler configured - rebalancing at {} daily, monitoring every {} min",
        config.schedule.rebalance_time, config.schedule.monitor_interval_mins
    );
    if advisor.is_some() {
        info!(
            "Strategy review every {} at {}",
            config.schedule.review_weekday, config.schedule.review_time
        );
    }

    log_failure(Job::Rebalance, run_job(Job::Rebalance, coordinator, config, advisor));

    loop {
        std::thread::sleep(POLL_INTERVAL);
        for job in schedule.due(Local::now().naive_local()) {
            log_failure(job, run_job(job, coordinator, config, advisor));
        }
    }
}

fn log_failure(job: Job, result: Result<()>) {
    if let Err(e) = result {
        error!("{job:?} cycle aborted: {e}");
    }
}
