// Runtime animation format

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{AnimError, Result};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Interpolation {
    #[default]
    Linear,
    Step,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AnimationClip {
    pub name: String,
    /// seconds
    pub duration: f32,
    pub tracks: Vec<Track>,
}

/// Keyframes for a single skeleton joint.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Track {
    pub joint: u32,
    /// If Some, T/R/S channels without their own times use this array.
    #[serde(default)]
    pub shared_times: Option<Box<[f32]>>,
    #[serde(default)]
    pub translation: Option<Channel<Vec3>>,
    #[serde(default)]
    pub rotation: Option<Channel<Quat>>,
    #[serde(default)]
    pub scale: Option<Channel<Vec3>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Channel<T> {
    #[serde(default)]
    pub times: Option<Box<[f32]>>, // None = use Track.shared_times
    pub values: Box<[T]>,
    #[serde(default)]
    pub interpolation: Interpolation,
}
impl<T> Channel<T> {
    pub fn new(times: Vec<f32>, values: Vec<T>) -> Self {
        Self {
            times: Some(times.into_boxed_slice()),
            values: values.into_boxed_slice(),
            interpolation: Interpolation::Linear,
        }
    }

    /// A single-sample channel holding `value` for the whole clip.
    pub fn constant(value: T) -> Self {
        Self::new(vec![0.0], vec![value])
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }
}

impl Track {
    pub fn new(joint: u32) -> Self {
        Self {
            joint,
            shared_times: None,
            translation: None,
            rotation: None,
            scale: None,
        }
    }

    pub fn with_translation(mut self, channel: Channel<Vec3>) -> Self {
        self.translation = Some(channel);
        self
    }

    pub fn with_rotation(mut self, channel: Channel<Quat>) -> Self {
        self.rotation = Some(channel);
        self
    }

    pub fn with_scale(mut self, channel: Channel<Vec3>) -> Self {
        self.scale = Some(channel);
        self
    }

    pub(crate) fn times<'a, T>(&'a self, channel: &'a Channel<T>) -> Option<&'a [f32]> {
        channel.times.as_deref().or(self.shared_times.as_deref())
    }
}

impl AnimationClip {
    /// Builds a clip, rejecting data that breaks the sampling invariants.
    pub fn new(name: impl Into<String>, duration: f32, tracks: Vec<Track>) -> Result<Self> {
        let clip = Self {
            name: name.into(),
            duration,
            tracks,
        };
        clip.validate()?;
        Ok(clip)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let clip: Self = serde_json::from_str(json)?;
        clip.validate()?;
        Ok(clip)
    }

    pub fn length(&self) -> f32 {
        self.duration
    }

    pub fn validate(&self) -> Result<()> {
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(self.invalid(format!("duration {} is not a finite non-negative number", self.duration)));
        }
        for track in &self.tracks {
            if let Some(channel) = &track.translation {
                self.validate_channel(track, channel, "translation")?;
            }
            if let Some(channel) = &track.rotation {
                self.validate_channel(track, channel, "rotation")?;
            }
            if let Some(channel) = &track.scale {
                self.validate_channel(track, channel, "scale")?;
            }
        }
        Ok(())
    }

    fn validate_channel<T>(&self, track: &Track, channel: &Channel<T>, kind: &str) -> Result<()> {
        let joint = track.joint;
        let Some(times) = track.times(channel) else {
            return Err(self.invalid(format!("joint {joint} {kind} channel has no times")));
        };
        if channel.values.is_empty() {
            return Err(self.invalid(format!("joint {joint} {kind} channel has no values")));
        }
        if times.len() != channel.values.len() {
            return Err(self.invalid(format!(
                "joint {joint} {kind} channel has {} times but {} values",
                times.len(),
                channel.values.len()
            )));
        }
        if times.windows(2).any(|w| !(w[0] <= w[1])) {
            return Err(self.invalid(format!("joint {joint} {kind} times are not sorted")));
        }
        Ok(())
    }

    fn invalid(&self, reason: String) -> AnimError {
        AnimError::InvalidClip {
            clip: self.name.clone(),
            reason,
        }
    }
}
