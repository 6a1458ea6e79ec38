use crate::{AudioFrame, Error, Result, FRAME_SIZE};

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    SampleFormat, StreamConfig,
};
use crossbeam_channel as channel;
use crossbeam_channel::{Receiver, Sender};
use log::{info, trace, warn};
use std::collections::VecDeque;

/// The transport side of an audio output: something that can be started and stopped.
pub trait OutputStream {
    fn play(&self) -> Result<()>;

    fn pause(&self) -> Result<()>;
}

pub struct AudioOutputDeviceStream {
    stream: cpal::Stream,
    config: StreamConfig,

    /// Receive a message when the device wants us to buffer another frame.
    buffer_request_rx: Receiver<()>,

    /// Send the audio samples to be played by the device.
    sample_tx: Sender<AudioFrame>,
}

impl AudioOutputDeviceStream {
    pub fn connect_default() -> Result<AudioOutputDeviceStream> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::AudioDevice("no output device available".to_string()))?;
        let supported_config = device.default_output_config()?;
        if supported_config.sample_format() != SampleFormat::F32 {
            return Err(Error::UnsupportedSampleFormat(format!(
                "{:?}",
                supported_config.sample_format()
            )));
        }
        let config = supported_config.config();
        info!("Creating output device stream with config:\n{:?}", config);

        let (buffer_request_tx, buffer_request_rx) = channel::unbounded();
        let (sample_tx, sample_rx) = channel::unbounded();

        // Frames only hold whole multi-channel samples.
        let channels = config.channels as usize;
        let usable_frame_len = (FRAME_SIZE / channels) * channels;
        let mut pending = VecDeque::with_capacity(2 * FRAME_SIZE);

        let stream = device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                service_cpal_output_stream_callback(
                    data,
                    &buffer_request_tx,
                    &sample_rx,
                    &mut pending,
                    usable_frame_len,
                )
            },
            move |err| warn!("Output stream error: {}", err),
            None,
        )?;
        // Some hosts start streams eagerly.
        stream.pause()?;

        Ok(AudioOutputDeviceStream {
            stream,
            config,
            buffer_request_rx,
            sample_tx,
        })
    }

    pub fn get_config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn num_channels(&self) -> usize {
        self.config.channels as usize
    }

    pub fn sample_hz(&self) -> f32 {
        self.config.sample_rate.0 as f32
    }

    pub fn get_buffer_request_rx(&self) -> &Receiver<()> {
        &self.buffer_request_rx
    }

    pub fn write_frame(&self, frame: AudioFrame) -> Result<()> {
        self.sample_tx
            .send(frame)
            .map_err(|_| Error::AudioDevice("output stream closed".to_string()))
    }
}

impl OutputStream for AudioOutputDeviceStream {
    fn play(&self) -> Result<()> {
        self.stream.play()?;

        Ok(())
    }

    fn pause(&self) -> Result<()> {
        self.stream.pause()?;

        Ok(())
    }
}

fn service_cpal_output_stream_callback(
    data: &mut [f32],
    buffer_request_tx: &Sender<()>,
    sample_rx: &Receiver<AudioFrame>,
    pending: &mut VecDeque<f32>,
    usable_frame_len: usize,
) {
    // We shouldn't block to receive samples from the synthesizer since this callback executes in a
    // realtime priority thread. This means the synthesizer thread needs to queue up samples at
    // least as quickly as CPAL can consume them, or else we'll play silence.
    let mut written = 0;
    while written < data.len() {
        if pending.is_empty() {
            match sample_rx.try_recv() {
                Ok(frame) => {
                    pending.extend(frame[..usable_frame_len].iter());
                    // Ask for a replacement for every frame taken off the queue.
                    let _ = buffer_request_tx.send(());
                }
                Err(_) => {
                    trace!("CPAL received empty frame"); // Oh no! A glitch!
                    break;
                }
            }
        }

        let n = (data.len() - written).min(pending.len());
        for (out, sample) in data[written..written + n].iter_mut().zip(pending.drain(..n)) {
            *out = sample;
        }
        written += n;
    }

    for out in data[written..].iter_mut() {
        *out = 0.0;
    }
}
