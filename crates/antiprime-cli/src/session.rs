use crate::{
    command::{Command, HELP},
    view,
};
use antiprime::{Engine, Error, ScoredNumber};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::{JoinError, JoinSet};

type SearchResult = Result<antiprime::Result<ScoredNumber>, JoinError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Interactive front end state.
///
/// Requested terms are queued and searched one at a time on the blocking
/// pool, so `next 3` always appends three distinct terms. New terms reach the
/// terminal through the observer in [`view::attach`], not through here.
///
/// `cancel` and `reset` bump `epoch`. A queued search only starts if the epoch
/// it was queued under is still current; the check and the start happen under
/// the same lock as the bump, so an interrupted term is never appended.
pub struct Session {
    engine: Arc<Engine>,
    show_last: usize,
    queued: u64,
    epoch: Arc<Mutex<u64>>,
    searches: JoinSet<antiprime::Result<ScoredNumber>>,
}

impl Session {
    pub fn new(engine: Arc<Engine>, show_last: usize) -> Self {
        Self {
            engine,
            show_last,
            queued: 0,
            epoch: Arc::new(Mutex::new(0)),
            searches: JoinSet::new(),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Returns `true` when no term is queued or being searched for.
    pub fn is_idle(&self) -> bool {
        self.queued == 0 && self.searches.is_empty()
    }

    pub fn apply(&mut self, command: Command) -> Flow {
        match command {
            Command::Next(count) => {
                self.queued = self.queued.saturating_add(count);
                self.pump();
            }
            Command::Reset => {
                let mut epoch = self.epoch.lock();
                *epoch += 1;
                self.queued = 0;
                self.engine.reset_sequence();
            }
            Command::Show => println!(
                "{}",
                view::render_terms(
                    &self.engine.last_k(self.show_last),
                    self.engine.store().len()
                )
            ),
            Command::Stats => println!("{}", view::render_stats(&self.engine.stats())),
            Command::Cancel => {
                let mut epoch = self.epoch.lock();
                *epoch += 1;
                self.queued = 0;
                if !self.engine.cancel() && self.searches.is_empty() {
                    println!("no search is running");
                }
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    /// Waits for the running search to finish; `None` when nothing runs.
    pub async fn search_finished(&mut self) -> Option<SearchResult> {
        self.searches.join_next().await
    }

    pub fn finish(&mut self, joined: SearchResult) {
        match joined {
            Ok(Ok(term)) => tracing::debug!("Appended {}", term),
            Ok(Err(Error::SearchCancelled)) => tracing::info!("Search cancelled"),
            Ok(Err(e)) => {
                tracing::warn!("Search failed: {}", e);
                self.queued = 0;
            }
            Err(e) => {
                tracing::error!("Search task failed: {:?}", e);
                self.queued = 0;
            }
        }
        self.pump();
    }

    /// Shuts the engine down, waits for outstanding searches and joins the
    /// worker pool.
    pub async fn shutdown(mut self) -> anyhow::Result<()> {
        self.queued = 0;
        self.engine.coordinator().shutdown();
        while let Some(joined) = self.searches.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Search task failed during shutdown: {:?}", e);
            }
        }
        crate::stop_engine(self.engine).await
    }

    fn pump(&mut self) {
        if self.queued == 0 || !self.searches.is_empty() {
            return;
        }
        self.queued -= 1;
        let engine = Arc::clone(&self.engine);
        let epoch = Arc::clone(&self.epoch);
        let queued_under = *epoch.lock();
        self.searches.spawn_blocking(move || {
            let handle = {
                let current = epoch.lock();
                if *current != queued_under {
                    return Err(Error::SearchCancelled);
                }
                engine.extend_sequence()?
            };
            handle.wait()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use antiprime::{DivisorCounter, EngineConfig, TrialDivision};
    use std::{
        sync::atomic::{AtomicBool, Ordering},
        thread,
        time::Duration,
    };

    /// Values from 2 up block until `open` is set.
    struct Gated {
        open: Arc<AtomicBool>,
    }

    impl DivisorCounter for Gated {
        fn count_divisors(&self, n: u64) -> u64 {
            if n >= 2 {
                while !self.open.load(Ordering::Acquire) {
                    thread::sleep(Duration::from_millis(1));
                }
            }
            TrialDivision.count_divisors(n)
        }
    }

    fn session(num_workers: usize) -> Session {
        let engine = Engine::new(EngineConfig::default().with_num_workers(num_workers)).unwrap();
        Session::new(Arc::new(engine), 5)
    }

    fn gated_session() -> (Session, Arc<AtomicBool>) {
        let open = Arc::new(AtomicBool::new(false));
        let counter = Gated {
            open: Arc::clone(&open),
        };
        let engine =
            Engine::with_counter(EngineConfig::default().with_num_workers(2), counter).unwrap();
        (Session::new(Arc::new(engine), 5), open)
    }

    async fn drain(session: &mut Session) {
        while let Some(joined) = session.search_finished().await {
            session.finish(joined);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn queued_terms_are_searched_one_after_another() {
        let mut session = session(3);
        assert_eq!(session.apply(Command::Next(2)), Flow::Continue);
        assert_eq!(session.apply(Command::Next(3)), Flow::Continue);
        assert!(!session.is_idle());

        drain(&mut session).await;
        assert!(session.is_idle());
        assert_eq!(session.engine().last(), ScoredNumber::new(24, 8));
        assert_eq!(session.engine().store().len(), 6);
        session.shutdown().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancel_drops_the_pending_term_and_the_queue() {
        let (mut session, open) = gated_session();
        session.apply(Command::Next(1_000));
        // The spawned search may or may not have started by now.
        session.apply(Command::Cancel);
        open.store(true, Ordering::Release);
        drain(&mut session).await;

        assert!(session.is_idle());
        assert_eq!(session.engine().snapshot(), vec![ScoredNumber::SEED]);
        assert!(!session.engine().is_searching());

        session.apply(Command::Next(1));
        drain(&mut session).await;
        assert_eq!(session.engine().last(), ScoredNumber::new(2, 2));
        session.shutdown().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn reset_drops_the_pending_term_and_the_queue() {
        let (mut session, open) = gated_session();
        session.apply(Command::Next(1));
        session.apply(Command::Reset);
        open.store(true, Ordering::Release);
        drain(&mut session).await;

        assert!(session.is_idle());
        assert_eq!(session.engine().snapshot(), vec![ScoredNumber::SEED]);

        session.apply(Command::Next(2));
        drain(&mut session).await;
        assert_eq!(
            session.engine().snapshot(),
            vec![
                ScoredNumber::SEED,
                ScoredNumber::new(2, 2),
                ScoredNumber::new(4, 3)
            ]
        );
        assert_eq!(session.apply(Command::Quit), Flow::Quit);
        session.shutdown().await.unwrap();
    }
}
