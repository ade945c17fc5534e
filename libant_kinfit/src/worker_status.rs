/// Progress message sent from the processing thread
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkerStatus {
    /// Fraction of the current run that has been read
    pub progress: f32,
    pub run_number: i32,
}

impl WorkerStatus {
    pub fn new(progress: f32, run_number: i32) -> Self {
        Self {
            progress,
            run_number,
        }
    }
}
