use std::path::PathBuf;
use crate::error::{WallfitError, SwwwError};
use crate::selector::Slot;
use crate::Result;

const CURRENT_IMAGE_MARKER: &str = "currently displaying: image:";

/// One output as reported by `swww query`.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayOutput {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub scale: f32,
    pub current_image: Option<PathBuf>,
}

impl DisplayOutput {
    pub fn to_slot(&self) -> Slot {
        Slot {
            id: self.name.clone(),
            width: self.width,
            height: self.height,
            current: self.current_image.clone(),
        }
    }
}

pub fn locate_swww() -> Result<PathBuf> {
    which::which("swww").map_err(|_| WallfitError::Swww(SwwwError::BinaryNotFound))
}

/// Parses the full stdout of `swww query`, skipping lines that do not
/// describe a usable output.
pub fn parse_query_output(stdout: &str) -> Vec<DisplayOutput> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match parse_query_line(line) {
            Ok(output) => Some(output),
            Err(e) => {
                log::debug!("Ignoring swww query line: {}", e);
                None
            }
        })
        .collect()
}

/// Parses lines like
/// `HDMI-A-1: 1920x1080, scale: 1, currently displaying: image: /walls/a.jpg`.
/// Some swww versions prefix the line with `": "`.
pub fn parse_query_line(line: &str) -> Result<DisplayOutput> {
    let invalid = || WallfitError::Swww(SwwwError::InvalidOutput { line: line.to_string() });

    let trimmed = line.trim().trim_start_matches(':').trim_start();
    let (name, rest) = trimmed.split_once(':').ok_or_else(invalid)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(invalid());
    }

    let (geometry, tail) = rest.split_once(',').unwrap_or((rest, ""));
    let (width, height) = geometry.trim().split_once('x').ok_or_else(invalid)?;
    let width: u32 = width.trim().parse().map_err(|_| invalid())?;
    let height: u32 = height.trim().parse().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
        return Err(invalid());
    }

    let scale = tail
        .split(',')
        .find_map(|field| field.trim().strip_prefix("scale:"))
        .and_then(|value| value.trim().parse::<f32>().ok())
        .unwrap_or(1.0);

    // The path is the remainder of the line and may itself contain commas.
    let current_image = tail
        .find(CURRENT_IMAGE_MARKER)
        .map(|idx| tail[idx + CURRENT_IMAGE_MARKER.len()..].trim())
        .filter(|path| !path.is_empty())
        .map(PathBuf::from);

    Ok(DisplayOutput {
        name: name.to_string(),
        width,
        height,
        scale,
        current_image,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_with_image() {
        let output = parse_query_line(
            "HDMI-A-1: 1920x1080, scale: 1, currently displaying: image: /home/u/walls/a.jpg",
        )
        .unwrap();

        assert_eq!(output.name, "HDMI-A-1");
        assert_eq!((output.width, output.height), (1920, 1080));
        assert_eq!(output.scale, 1.0);
        assert_eq!(output.current_image, Some(PathBuf::from("/home/u/walls/a.jpg")));
    }

    #[test]
    fn test_parse_line_with_leading_colon_and_color() {
        let output = parse_query_line(": DP-2: 2560x1440, scale: 1.5, currently displaying: color: 000000").unwrap();

        assert_eq!(output.name, "DP-2");
        assert_eq!((output.width, output.height), (2560, 1440));
        assert_eq!(output.scale, 1.5);
        assert_eq!(output.current_image, None);
    }

    #[test]
    fn test_parse_line_path_with_commas() {
        let output = parse_query_line(
            "eDP-1: 2880x1800, scale: 2, currently displaying: image: /walls/sea, sky, sun.png",
        )
        .unwrap();

        assert_eq!(output.current_image, Some(PathBuf::from("/walls/sea, sky, sun.png")));
        assert_eq!(output.to_slot().current, output.current_image);
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        assert!(parse_query_line("garbage").is_err());
        assert!(parse_query_line("DP-1: widexhigh, scale: 1").is_err());
        assert!(parse_query_line("DP-1: 1920x0, scale: 1").is_err());
        assert!(parse_query_line(": : 1920x1080").is_err());
    }

    #[test]
    fn test_parse_query_output_skips_bad_lines() {
        let stdout = "\
DP-1: 1920x1080, scale: 1, currently displaying: image: /w/a.jpg
this line is noise

DP-2: 1080x1920, scale: 1, currently displaying: color: 112233
";
        let outputs = parse_query_output(stdout);

        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].to_slot(), Slot::new("DP-1", 1920, 1080).with_current("/w/a.jpg"));
        assert_eq!(outputs[1].to_slot(), Slot::new("DP-2", 1080, 1920));
    }
}
