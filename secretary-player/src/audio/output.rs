//! Audio output using cpal
//!
//! Each playback handle owns one cpal stream. Streams are not `Send`, so every
//! stream lives on its own output thread which the handle steers over a
//! command channel. The thread also produces the periodic progress reports
//! and notices when the recording has been played to the end.

use super::resampler::Resampler;
use super::{DecodedAudio, HandleEvent, HandleEventSink, PlaybackBackend, PlaybackHandle};
use crate::error::{Error, Result};
use crate::fetch::AudioPayload;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Preferred output rate when the device supports it
const PREFERRED_SAMPLE_RATE: u32 = 44_100;

/// Backend that plays decoded recordings on a cpal output device
pub struct CpalBackend {
    /// Requested device (None = default)
    device_name: Option<String>,
    config: StreamConfig,
    sample_format: SampleFormat,
    progress_interval: Duration,
}

impl CpalBackend {
    /// List available audio output devices.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Probe the output device once and remember its stream configuration.
    ///
    /// Falls back to the default device if `device_name` is not found.
    pub fn new(device_name: Option<String>, progress_interval: Duration) -> Result<Self> {
        let device = find_device(device_name.as_deref())?;
        let (config, sample_format) = best_config(&device)?;

        info!(
            "Audio output: {} ({}Hz, {} channels, {:?})",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            config.sample_rate.0,
            config.channels,
            sample_format
        );

        Ok(Self {
            device_name,
            config,
            sample_format,
            progress_interval,
        })
    }

    /// Sample rate every decoded recording is converted to
    pub fn output_rate(&self) -> u32 {
        self.config.sample_rate.0
    }
}

impl PlaybackBackend for CpalBackend {
    fn decode(&self, payload: AudioPayload) -> Result<DecodedAudio> {
        let decoded = super::decode::decode_payload(payload)?;
        if decoded.sample_rate() == self.output_rate() {
            return Ok(decoded);
        }

        let samples = Resampler::resample(
            decoded.samples(),
            decoded.sample_rate(),
            self.output_rate(),
            2,
        )?;
        Ok(DecodedAudio::new(samples, self.output_rate()))
    }

    fn open(&self, audio: DecodedAudio, events: HandleEventSink) -> Result<Box<dyn PlaybackHandle>> {
        let job = OutputJob {
            device_name: self.device_name.clone(),
            config: self.config.clone(),
            sample_format: self.sample_format,
            cursor: Arc::new(PlaybackCursor::new(audio)),
            events,
            progress_interval: self.progress_interval,
        };
        Ok(Box::new(CpalHandle::spawn(job)?))
    }
}

fn find_device(device_name: Option<&str>) -> Result<Device> {
    let host = cpal::default_host();

    if let Some(name) = device_name {
        let mut devices = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?;

        if let Some(device) = devices.find(|d| d.name().ok().as_deref() == Some(name)) {
            return Ok(device);
        }
        warn!("Requested device '{}' not found, falling back to default device", name);
    }

    host.default_output_device()
        .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))
}

/// Prefer 44.1kHz stereo f32, otherwise take the device default.
fn best_config(device: &Device) -> Result<(StreamConfig, SampleFormat)> {
    let mut supported_configs = device
        .supported_output_configs()
        .map_err(|e| Error::AudioOutput(format!("Failed to get device configs: {}", e)))?;

    let preferred = supported_configs.find(|config| {
        config.channels() == 2
            && config.min_sample_rate().0 <= PREFERRED_SAMPLE_RATE
            && config.max_sample_rate().0 >= PREFERRED_SAMPLE_RATE
            && config.sample_format() == SampleFormat::F32
    });

    if let Some(supported_config) = preferred {
        let sample_format = supported_config.sample_format();
        let config = supported_config
            .with_sample_rate(cpal::SampleRate(PREFERRED_SAMPLE_RATE))
            .config();
        return Ok((config, sample_format));
    }

    let supported_config = device
        .default_output_config()
        .map_err(|e| Error::AudioOutput(format!("Failed to get default config: {}", e)))?;

    Ok((supported_config.config(), supported_config.sample_format()))
}

/// Read position into a decoded recording, shared with the audio callback
struct PlaybackCursor {
    audio: DecodedAudio,
    /// Next stereo frame to emit; written only by the audio callback
    frame: AtomicUsize,
}

impl PlaybackCursor {
    fn new(audio: DecodedAudio) -> Self {
        Self {
            audio,
            frame: AtomicUsize::new(0),
        }
    }

    fn next_frame(&self) -> Option<(f32, f32)> {
        let frame = self.frame.load(Ordering::Relaxed);
        let samples = self.audio.samples();
        let idx = frame * 2;
        if idx + 1 >= samples.len() {
            return None;
        }
        self.frame.store(frame + 1, Ordering::Relaxed);
        Some((samples[idx], samples[idx + 1]))
    }

    fn is_finished(&self) -> bool {
        self.frame.load(Ordering::Relaxed) >= self.audio.frames()
    }

    fn position_ms(&self) -> u64 {
        let rate = self.audio.sample_rate().max(1) as u64;
        self.frame.load(Ordering::Relaxed) as u64 * 1000 / rate
    }
}

enum OutputCommand {
    Play,
    Pause,
    Shutdown,
}

/// Everything the output thread needs to build and run its stream
struct OutputJob {
    device_name: Option<String>,
    config: StreamConfig,
    sample_format: SampleFormat,
    cursor: Arc<PlaybackCursor>,
    events: HandleEventSink,
    progress_interval: Duration,
}

/// Handle to one output thread; dropping it stops the stream and joins the thread
pub struct CpalHandle {
    commands: mpsc::Sender<OutputCommand>,
    thread: Option<JoinHandle<()>>,
}

impl CpalHandle {
    /// Start the output thread and wait until its stream is built (paused)
    fn spawn(job: OutputJob) -> Result<Self> {
        let (commands, command_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let session = job.events.session();

        let thread = std::thread::Builder::new()
            .name(format!("call-audio-{}", session))
            .spawn(move || run_output(job, command_rx, ready_tx))
            .map_err(|e| Error::AudioOutput(format!("Failed to start output thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                commands,
                thread: Some(thread),
            }),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(Error::AudioOutput(
                    "Output thread exited during setup".to_string(),
                ))
            }
        }
    }
}

impl PlaybackHandle for CpalHandle {
    fn play(&mut self) -> Result<()> {
        self.commands
            .send(OutputCommand::Play)
            .map_err(|_| Error::AudioOutput("Output thread is gone".to_string()))
    }

    fn pause(&mut self) {
        let _ = self.commands.send(OutputCommand::Pause);
    }
}

impl Drop for CpalHandle {
    fn drop(&mut self) {
        let _ = self.commands.send(OutputCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Audio output thread panicked");
            }
        }
    }
}

/// Body of the output thread
fn run_output(
    job: OutputJob,
    commands: mpsc::Receiver<OutputCommand>,
    ready: mpsc::SyncSender<Result<()>>,
) {
    let stream = match build_stream(&job) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    let duration_ms = Some(job.cursor.audio.duration_ms());
    let mut playing = false;

    loop {
        match commands.recv_timeout(job.progress_interval) {
            Ok(OutputCommand::Play) => match stream.play() {
                Ok(()) => playing = true,
                Err(e) => job
                    .events
                    .send(HandleEvent::Error(format!("failed to start audio stream: {}", e))),
            },
            Ok(OutputCommand::Pause) => {
                let _ = stream.pause();
                playing = false;
            }
            Ok(OutputCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        if playing {
            job.events.send(HandleEvent::Progress {
                position_ms: job.cursor.position_ms(),
                duration_ms,
            });

            if job.cursor.is_finished() {
                let _ = stream.pause();
                playing = false;
                job.events.send(HandleEvent::Ended);
            }
        }
    }

    let _ = stream.pause();
    debug!("Audio output thread for session {} exiting", job.events.session());
}

fn build_stream(job: &OutputJob) -> Result<Stream> {
    let device = find_device(job.device_name.as_deref())?;

    let stream = match job.sample_format {
        SampleFormat::F32 => build_typed_stream::<f32>(&device, job)?,
        SampleFormat::I16 => build_typed_stream::<i16>(&device, job)?,
        SampleFormat::U16 => build_typed_stream::<u16>(&device, job)?,
        sample_format => {
            return Err(Error::AudioOutput(format!(
                "Unsupported sample format: {:?}",
                sample_format
            )));
        }
    };

    // Some hosts start streams as soon as they are built
    let _ = stream.pause();
    Ok(stream)
}

fn build_typed_stream<T>(device: &Device, job: &OutputJob) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = job.config.channels as usize;
    let cursor = Arc::clone(&job.cursor);
    let sink = job.events.clone();

    device
        .build_output_stream(
            &job.config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels) {
                    let (left, right) = cursor.next_frame().unwrap_or((0.0, 0.0));

                    if frame.len() == 1 {
                        frame[0] = T::from_sample(((left + right) * 0.5).clamp(-1.0, 1.0));
                        continue;
                    }
                    for (ch_idx, sample) in frame.iter_mut().enumerate() {
                        let value = match ch_idx {
                            0 => left,
                            1 => right,
                            _ => 0.0,
                        };
                        *sample = T::from_sample(value.clamp(-1.0, 1.0));
                    }
                }
            },
            move |err| {
                error!("Audio stream error: {}", err);
                sink.send(HandleEvent::Error(format!("audio device error: {}", err)));
            },
            None,
        )
        .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
}
