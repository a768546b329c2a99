use std::io::Cursor;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::warn;

use crate::gemini_api::{
    generate_content, GenerateContentRequest, GenerationConfig, InlineData, PrebuiltVoiceConfig,
    SpeechConfig, VoiceConfig,
};
use crate::prompt::image_prompt;
use crate::{DictionaryConfig, DictionaryError, Meaning, StudentLevel};

/// Sample rate of the PCM returned by the speech model.
pub const SPEECH_SAMPLE_RATE: u32 = 24_000;

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl GeneratedImage {
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "png",
        }
    }
}

/// Mono 16-bit speech.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechClip {
    pub sample_rate: u32,
    pub samples: Vec<i16>,
}

impl SpeechClip {
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    fn wav_spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    pub fn to_wav(&self) -> Result<Vec<u8>, hound::Error> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, self.wav_spec())?;
            for sample in &self.samples {
                writer.write_sample(*sample)?;
            }
            writer.finalize()?;
        }
        Ok(cursor.into_inner())
    }
}

fn decode_image(inline: &InlineData) -> Result<GeneratedImage, base64::DecodeError> {
    Ok(GeneratedImage {
        mime_type: inline.mime_type.clone(),
        bytes: STANDARD.decode(inline.data.trim())?,
    })
}

/// Decodes base64 little-endian 16-bit PCM. A trailing odd byte is dropped.
pub(crate) fn decode_pcm(data: &str) -> Result<Vec<i16>, base64::DecodeError> {
    let bytes = STANDARD.decode(data.trim())?;
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Reads `rate=` out of a mime type such as `audio/L16;codec=pcm;rate=24000`.
fn sample_rate_of(mime_type: &str) -> u32 {
    mime_type
        .split(';')
        .filter_map(|param| param.trim().strip_prefix("rate="))
        .find_map(|rate| rate.parse().ok())
        .unwrap_or(SPEECH_SAMPLE_RATE)
}

async fn try_generate_image(
    client: &reqwest::Client,
    config: &DictionaryConfig,
    word: &str,
    meaning: &Meaning,
    level: StudentLevel,
) -> Result<Option<GeneratedImage>, DictionaryError> {
    let request = GenerateContentRequest::from_prompt(
        image_prompt(word, meaning, level),
        GenerationConfig {
            response_modalities: Some(vec!["IMAGE".to_owned()]),
            ..GenerationConfig::default()
        },
    );
    let response = generate_content(client, config, &config.image_model, &request).await?;
    let Some(inline) = response.inline_data() else {
        return Ok(None);
    };
    match decode_image(inline) {
        Ok(image) => Ok(Some(image)),
        Err(error) => {
            warn!("image payload for {word:?} is not valid base64: {error}");
            Ok(None)
        }
    }
}

pub(crate) async fn generate_image(
    client: &reqwest::Client,
    config: &DictionaryConfig,
    word: &str,
    meaning: &Meaning,
    level: StudentLevel,
) -> Option<GeneratedImage> {
    match try_generate_image(client, config, word, meaning, level).await {
        Ok(image) => image,
        Err(error) => {
            warn!("image generation for {word:?} failed: {error}");
            None
        }
    }
}

async fn try_synthesize_speech(
    client: &reqwest::Client,
    config: &DictionaryConfig,
    text: &str,
) -> Result<Option<SpeechClip>, DictionaryError> {
    let request = GenerateContentRequest::from_prompt(
        text.to_owned(),
        GenerationConfig {
            response_modalities: Some(vec!["AUDIO".to_owned()]),
            speech_config: Some(SpeechConfig {
                voice_config: VoiceConfig {
                    prebuilt_voice_config: PrebuiltVoiceConfig {
                        voice_name: config.voice.clone(),
                    },
                },
            }),
            ..GenerationConfig::default()
        },
    );
    let response = generate_content(client, config, &config.speech_model, &request).await?;
    let Some(inline) = response.inline_data() else {
        return Ok(None);
    };
    match decode_pcm(&inline.data) {
        Ok(samples) if !samples.is_empty() => Ok(Some(SpeechClip {
            sample_rate: sample_rate_of(&inline.mime_type),
            samples,
        })),
        Ok(_) => Ok(None),
        Err(error) => {
            warn!("speech payload is not valid base64: {error}");
            Ok(None)
        }
    }
}

pub(crate) async fn synthesize_speech(
    client: &reqwest::Client,
    config: &DictionaryConfig,
    text: &str,
) -> Option<SpeechClip> {
    match try_synthesize_speech(client, config, text).await {
        Ok(clip) => clip,
        Err(error) => {
            warn!("speech synthesis failed: {error}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_little_endian_pcm() {
        let bytes = [0x01u8, 0x00, 0xff, 0xff, 0x00, 0x80, 0x7f];
        let samples = decode_pcm(&STANDARD.encode(bytes)).unwrap();
        assert_eq!(samples, vec![1, -1, i16::MIN]);
        assert!(decode_pcm("not base64!").is_err());
    }

    #[test]
    fn reads_the_sample_rate_from_the_mime_type() {
        assert_eq!(sample_rate_of("audio/L16;codec=pcm;rate=16000"), 16_000);
        assert_eq!(sample_rate_of("audio/L16; rate=44100"), 44_100);
        assert_eq!(sample_rate_of("audio/pcm"), SPEECH_SAMPLE_RATE);
    }

    #[test]
    fn encodes_speech_as_wav() {
        let clip = SpeechClip {
            sample_rate: SPEECH_SAMPLE_RATE,
            samples: vec![0, 1000, -1000, 0],
        };
        let wav = clip.to_wav().unwrap();
        assert_eq!(&wav[..4], b"RIFF");
        let mut reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        assert_eq!(reader.spec().sample_rate, SPEECH_SAMPLE_RATE);
        let samples = reader.samples::<i16>().collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(samples, clip.samples);
    }

    #[test]
    fn clip_duration_follows_the_sample_rate() {
        let clip = SpeechClip {
            sample_rate: SPEECH_SAMPLE_RATE,
            samples: vec![0; 12_000],
        };
        assert_eq!(clip.duration(), Duration::from_millis(500));
    }

    #[test]
    fn decodes_inline_images() {
        let inline = InlineData {
            mime_type: "image/jpeg".to_owned(),
            data: STANDARD.encode([0xffu8, 0xd8, 0xff]),
        };
        let image = decode_image(&inline).unwrap();
        assert_eq!(image.bytes, vec![0xff, 0xd8, 0xff]);
        assert_eq!(image.extension(), "jpg");
    }
}
