use super::*;

/// What a template did to the current job.
#[derive(Debug, Clone)]
pub(crate) enum Transition {
    /// The template builds on a different block. Older jobs are no longer valid.
    NewBlock(Arc<Job>),
    /// Same block, refreshed transactions or time. Older jobs stay valid.
    Updated(Arc<Job>),
    /// The template is for a lower height than the current job.
    Rejected,
}

#[derive(Debug, Default)]
struct State {
    current: Option<Arc<Job>>,
    valid: HashMap<JobId, Arc<Job>>,
}

#[derive(Debug)]
pub(crate) struct JobManager {
    config: JobConfig,
    counter: JobCounter,
    state: Mutex<State>,
    timer: BroadcastTimer,
}

impl JobManager {
    pub(crate) fn new(config: JobConfig) -> Self {
        Self {
            timer: BroadcastTimer::new(config.rebroadcast_interval),
            config,
            counter: JobCounter::new(),
            state: Mutex::new(State::default()),
        }
    }

    pub(crate) fn current(&self) -> Option<Arc<Job>> {
        self.state.lock().current.clone()
    }

    pub(crate) fn get(&self, id: JobId) -> Option<Arc<Job>> {
        self.state.lock().valid.get(&id).cloned()
    }

    pub(crate) fn valid_jobs(&self) -> usize {
        self.state.lock().valid.len()
    }

    pub(crate) fn timer(&self) -> &BroadcastTimer {
        &self.timer
    }

    pub(crate) fn reset_broadcast(&self) {
        self.timer.reset();
    }

    pub(crate) fn stop_broadcast(&self) {
        self.timer.stop();
    }

    /// Builds a job from `template` and makes it current. A template that fails to build leaves
    /// the current job, the valid job index and the job id sequence untouched.
    pub(crate) fn process_template(&self, template: BlockTemplate) -> Result<Transition> {
        let mut state = self.state.lock();

        let new_block = match &state.current {
            None => true,
            Some(current) if current.template.previous_block_hash != template.previous_block_hash => {
                if template.height < current.height() {
                    debug!(
                        "Ignoring template for height {} below current height {}",
                        template.height,
                        current.height()
                    );
                    return Ok(Transition::Rejected);
                }
                true
            }
            Some(_) => false,
        };

        let job = Arc::new(Job::new(self.counter.peek(), template, &self.config)?);

        self.counter.next();

        if new_block {
            state.valid.clear();
        }

        state.valid.insert(job.id, job.clone());
        state.current = Some(job.clone());

        Ok(if new_block {
            info!(
                "New block {} at height {}, job {}",
                job.prev_hash_hex(),
                job.height(),
                job.id
            );
            Transition::NewBlock(job)
        } else {
            debug!("Updated job {} at height {}", job.id, job.height());
            Transition::Updated(job)
        })
    }
}
