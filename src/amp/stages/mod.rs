pub mod common;
pub mod filter;
pub mod level;
pub mod waveshaper;

// The core trait that all processing stages must implement
pub trait Stage: Send + Sync + 'static {
    // Process a single sample through this stage
    fn process(&mut self, input: f32) -> f32;

    // Process a block of samples through this stage
    fn process_block(&mut self, input: &mut [f32]) {
        for sample in input.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    // Clear any delay memory, called on stream (re)start
    fn reset(&mut self) {}
}
