//! Video probing and frame extraction using FFmpeg

use crate::{Error, Result};
use ffmpeg_next as ffmpeg;
use filmstrip_core::{AffineTransform, RationalTime, Size, VideoAsset, VideoTrack};
use image::{imageops, RgbaImage};
use std::path::Path;
use std::sync::OnceLock;

/// FFmpeg's internal time base, in ticks per second
const AV_TIME_BASE: i32 = 1_000_000;

static FFMPEG_INIT: OnceLock<std::result::Result<(), ffmpeg::Error>> = OnceLock::new();

/// Initialize FFmpeg (once per process)
fn init_ffmpeg() -> Result<()> {
    (*FFMPEG_INIT.get_or_init(ffmpeg::init)).map_err(Error::from)
}

type ScalerKey = (ffmpeg::format::Pixel, u32, u32, u32, u32);

/// Video reader that seeks to timestamps and extracts single frames
pub struct VideoReader {
    input: ffmpeg::format::context::Input,
    video_stream_index: usize,
    time_base: ffmpeg::Rational,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: Option<(ScalerKey, ffmpeg::software::scaling::Context)>,
}

impl VideoReader {
    /// Opens a video file
    pub fn open(path: &Path) -> Result<Self> {
        init_ffmpeg()?;

        let input = ffmpeg::format::input(&path)?;

        let video_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or(Error::NoVideoStream)?;

        let video_stream_index = video_stream.index();
        let time_base = video_stream.time_base();

        let context = ffmpeg::codec::context::Context::from_parameters(video_stream.parameters())?;
        let decoder = context.decoder().video()?;

        Ok(Self {
            input,
            video_stream_index,
            time_base,
            decoder,
            scaler: None,
        })
    }

    /// Encoded frame size before orientation is applied
    pub fn natural_size(&self) -> Size {
        Size::new(self.decoder.width() as f64, self.decoder.height() as f64)
    }

    /// Total duration, in the stream's time base when it is known
    pub fn duration(&self) -> RationalTime {
        if let Some(stream) = self.input.stream(self.video_stream_index) {
            let duration = stream.duration();
            let tb = self.time_base;
            if duration > 0 && tb.numerator() > 0 && tb.denominator() > 0 {
                if let Some(value) = duration.checked_mul(tb.numerator() as i64) {
                    return RationalTime::new(value, tb.denominator());
                }
            }
        }

        // Fallback to container duration
        RationalTime::new(self.input.duration().max(0), AV_TIME_BASE)
    }

    /// Clockwise display rotation from the stream's `rotate` tag
    pub fn rotation_degrees(&self) -> f64 {
        self.input
            .stream(self.video_stream_index)
            .and_then(|stream| {
                stream
                    .metadata()
                    .get("rotate")
                    .and_then(|value| value.trim().parse::<f64>().ok())
            })
            .unwrap_or(0.0)
    }

    /// Describes the opened file as a strip asset
    pub fn to_asset(&self, source: &Path) -> VideoAsset {
        let track = VideoTrack::new(
            self.natural_size(),
            AffineTransform::rotation_degrees(self.rotation_degrees()),
        );
        VideoAsset::new(source, self.duration(), vec![track])
    }

    /// Decodes the first frame at or after `time`, scaled to `target` pixels
    /// (after rotating by `quarter_turns` clockwise).
    ///
    /// Returns the image and the time the frame actually came from. Past the
    /// last frame, the final decoded frame is returned instead.
    pub fn frame_at(
        &mut self,
        time: RationalTime,
        target: (u32, u32),
        quarter_turns: u8,
    ) -> Result<(RgbaImage, RationalTime)> {
        let target_ts = to_stream_ts(time, self.time_base);
        let seek_ts = to_stream_ts(time, ffmpeg::Rational(1, AV_TIME_BASE));

        // Land on the keyframe at or before the target, then decode forward.
        self.input.seek(seek_ts, ..seek_ts)?;
        self.decoder.flush();

        let mut scratch = ffmpeg::frame::Video::empty();
        let mut best = ffmpeg::frame::Video::empty();
        let mut best_ts: Option<i64> = None;
        let reached = |ts: Option<i64>| ts.is_some_and(|ts| ts >= target_ts);

        for (stream, packet) in self.input.packets() {
            if stream.index() != self.video_stream_index {
                continue;
            }
            // Corrupt packets are skipped; the next keyframe may still decode.
            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }
            while self.decoder.receive_frame(&mut scratch).is_ok() {
                best_ts = Some(frame_ts(&scratch));
                std::mem::swap(&mut best, &mut scratch);
                if reached(best_ts) {
                    break;
                }
            }
            if reached(best_ts) {
                break;
            }
        }

        if !reached(best_ts) {
            // Flush decoder
            if self.decoder.send_eof().is_ok() {
                while self.decoder.receive_frame(&mut scratch).is_ok() {
                    best_ts = Some(frame_ts(&scratch));
                    std::mem::swap(&mut best, &mut scratch);
                    if reached(best_ts) {
                        break;
                    }
                }
            }
        }

        let ts = best_ts.ok_or(Error::NoFrame(time))?;
        let image = self.to_rgba(&best, target, quarter_turns)?;
        let actual = RationalTime::new(
            ts.saturating_mul(self.time_base.numerator() as i64),
            self.time_base.denominator(),
        );
        Ok((image, actual))
    }

    /// Scales a decoded frame to RGBA and applies the display rotation
    fn to_rgba(
        &mut self,
        frame: &ffmpeg::frame::Video,
        target: (u32, u32),
        quarter_turns: u8,
    ) -> Result<RgbaImage> {
        // Scale in encoded orientation; rotating afterwards yields `target`.
        let (width, height) = if quarter_turns % 2 == 1 {
            (target.1.max(1), target.0.max(1))
        } else {
            (target.0.max(1), target.1.max(1))
        };

        let key = (frame.format(), frame.width(), frame.height(), width, height);
        if self.scaler.as_ref().map_or(true, |(k, _)| *k != key) {
            let context = ffmpeg::software::scaling::Context::get(
                frame.format(),
                frame.width(),
                frame.height(),
                ffmpeg::format::Pixel::RGBA,
                width,
                height,
                ffmpeg::software::scaling::Flags::BILINEAR,
            )?;
            self.scaler = Some((key, context));
        }

        let mut rgba_frame = ffmpeg::frame::Video::empty();
        if let Some((_, scaler)) = self.scaler.as_mut() {
            scaler.run(frame, &mut rgba_frame)?;
        }

        // Rows may be padded past width * 4.
        let stride = rgba_frame.stride(0);
        let row = width as usize * 4;
        let data = rgba_frame.data(0);
        if stride < row || data.len() < stride * (height as usize - 1) + row {
            return Err(Error::InvalidFrame);
        }
        let mut pixels = Vec::with_capacity(row * height as usize);
        for y in 0..height as usize {
            pixels.extend_from_slice(&data[y * stride..y * stride + row]);
        }
        let image = RgbaImage::from_raw(width, height, pixels).ok_or(Error::InvalidFrame)?;

        Ok(match quarter_turns % 4 {
            1 => imageops::rotate90(&image),
            2 => imageops::rotate180(&image),
            3 => imageops::rotate270(&image),
            _ => image,
        })
    }
}

/// Probes a video file into a strip asset
pub fn probe_asset(path: &Path) -> Result<VideoAsset> {
    let reader = VideoReader::open(path)?;
    Ok(reader.to_asset(path))
}

/// Best-effort timestamp of a decoded frame in stream ticks
fn frame_ts(frame: &ffmpeg::frame::Video) -> i64 {
    frame.timestamp().or(frame.pts()).unwrap_or(0)
}

/// Rescales `time` to ticks of `time_base` without intermediate overflow
fn to_stream_ts(time: RationalTime, time_base: ffmpeg::Rational) -> i64 {
    let num = time_base.numerator() as i128;
    let den = time_base.denominator() as i128;
    if !time.is_valid() || num <= 0 || den <= 0 {
        return 0;
    }
    let ticks = time.value as i128 * den / (time.timescale as i128 * num);
    ticks.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}
