use std::fmt::Write;

use chorale_lib::{Project, Track, VOICE_COLOR_KEY};

/// One line per track: ordinal, singer, phonemizer, renderer and voice colors.
pub fn describe_track(project: &Project, track: &Track) -> String {
    let mut line = format!("{:>3}  {}", track.display_ordinal(), track.singer_name());
    if track.singer().is_some_and(|singer| !singer.found()) {
        line.push_str(" (not installed)");
    }
    let _ = write!(
        line,
        "  phonemizer={}  renderer={}",
        track.phonemizer_tag().unwrap_or("-"),
        track.renderer().map_or("-", |renderer| renderer.name()),
    );
    if let Some(voice_color) = track.try_get_expression(&project.expressions, VOICE_COLOR_KEY) {
        if !voice_color.options.is_empty() {
            let _ = write!(line, "  colors=[{}]", voice_color.options.join(", "));
        }
    }
    line
}

pub fn describe(project: &Project) -> Vec<String> {
    project
        .tracks
        .iter()
        .map(|track| describe_track(project, track))
        .collect()
}
