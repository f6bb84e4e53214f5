use super::{Candidate, Coordinator};
use crate::{Error, Result};

impl Coordinator {
    /// Hands the calling worker the next candidate of the running search.
    ///
    /// Blocks while idle. Within one search every call returns a distinct
    /// value, in strictly increasing order, with no gaps.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Shutdown`] once the coordinator is shut down. This is
    /// the only way the call ends without a candidate.
    pub fn next_candidate(&self) -> Result<Candidate> {
        let mut state = self.state.lock();
        loop {
            if state.is_shutdown() {
                return Err(Error::Shutdown);
            }
            if let Some(candidate) = state.dispatch() {
                return Ok(candidate);
            }
            self.wake.wait(&mut state);
        }
    }
}
