use std::{path::PathBuf, sync::atomic::AtomicBool};

use channel_store::StorageSink;
use chrono_tz::Tz;
use tokio::sync::Mutex;

use crate::{
    acquisition::{AcquisitionEngine, AcquisitionStrategy},
    clock::{Clock, SystemClock},
    resolver::ChannelResolver,
    AudioPipeline,
};

pub struct AudioPipelineBuilder<R = (), S = ()> {
    workdir: PathBuf,
    zone: Tz,
    resolver: R,
    sink: S,
    engine: AcquisitionEngine,
    clock: Box<dyn Clock + Send + Sync>,
}

impl AudioPipelineBuilder {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            zone: Tz::UTC,
            resolver: (),
            sink: (),
            engine: AcquisitionEngine::new(Vec::new()),
            clock: Box::new(SystemClock),
        }
    }
}

impl<R, S> AudioPipelineBuilder<R, S> {
    pub fn resolver<R2: ChannelResolver + Send + Sync + 'static>(
        self,
        resolver: R2,
    ) -> AudioPipelineBuilder<R2, S> {
        AudioPipelineBuilder {
            workdir: self.workdir,
            zone: self.zone,
            resolver,
            sink: self.sink,
            engine: self.engine,
            clock: self.clock,
        }
    }

    pub fn sink<S2: StorageSink + Send + Sync + 'static>(self, sink: S2) -> AudioPipelineBuilder<R, S2> {
        AudioPipelineBuilder {
            workdir: self.workdir,
            zone: self.zone,
            resolver: self.resolver,
            sink,
            engine: self.engine,
            clock: self.clock,
        }
    }

    /// Appends a strategy; strategies run in the order they were added.
    pub fn strategy(mut self, strategy: impl AcquisitionStrategy + 'static) -> Self {
        self.engine = self.engine.with_strategy(strategy);
        self
    }

    pub fn engine(mut self, engine: AcquisitionEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Zone whose calendar day defines "today"
    pub fn timezone(mut self, zone: Tz) -> Self {
        self.zone = zone;
        self
    }

    pub fn clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }
}

impl<R, S> AudioPipelineBuilder<R, S>
where
    R: ChannelResolver + Send + Sync + 'static,
    S: StorageSink + Send + Sync + 'static,
{
    pub fn build(self) -> AudioPipeline<R, S> {
        AudioPipeline {
            workdir: self.workdir,
            zone: self.zone,
            resolver: self.resolver,
            engine: self.engine,
            sink: self.sink,
            clock: self.clock,
            run_lock: Mutex::new(()),
            running: AtomicBool::new(false),
        }
    }
}
