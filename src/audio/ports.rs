use anyhow::{Context, Result};
use jack::{AudioIn, AudioOut, Client, Port, ProcessScope};

pub const INPUT_LEFT: &str = "in_left";
pub const INPUT_RIGHT: &str = "in_right";
pub const OUTPUT_LEFT: &str = "out_left";
pub const OUTPUT_RIGHT: &str = "out_right";

pub struct Ports {
    input_left: Port<AudioIn>,
    input_right: Port<AudioIn>,
    output_left: Port<AudioOut>,
    output_right: Port<AudioOut>,
}

impl Ports {
    pub fn new(client: &Client) -> Result<Self> {
        Ok(Self {
            input_left: client
                .register_port(INPUT_LEFT, AudioIn::default())
                .context("failed to register in port left")?,
            input_right: client
                .register_port(INPUT_RIGHT, AudioIn::default())
                .context("failed to register in port right")?,
            output_left: client
                .register_port(OUTPUT_LEFT, AudioOut::default())
                .context("failed to register out port left")?,
            output_right: client
                .register_port(OUTPUT_RIGHT, AudioOut::default())
                .context("failed to register out port right")?,
        })
    }

    /// Copy both inputs into the output buffers and hand those back for
    /// in-place processing.
    pub fn stage_outputs<'a>(&'a mut self, ps: &'a ProcessScope) -> [&'a mut [f32]; 2] {
        let out_left = self.output_left.as_mut_slice(ps);
        let out_right = self.output_right.as_mut_slice(ps);

        copy_or_silence(out_left, self.input_left.as_slice(ps));
        copy_or_silence(out_right, self.input_right.as_slice(ps));

        [out_left, out_right]
    }
}

fn copy_or_silence(output: &mut [f32], input: &[f32]) {
    let frame_count = input.len().min(output.len());
    output[..frame_count].copy_from_slice(&input[..frame_count]);
    output[frame_count..].fill(0.0);
}
