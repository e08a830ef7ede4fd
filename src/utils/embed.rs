use serenity::builder::{CreateEmbed, CreateEmbedFooter};

use crate::music::{LoopMode, Track};
use crate::playback::state::RadioSession;

const GREEN: u32 = 0x1DB954;
const BLURPLE: u32 = 0x5865F2;
const RED: u32 = 0xED4245;
const YELLOW: u32 = 0xFEE75C;

fn track_link(track: &Track) -> String {
    format!("[{}]({})", track.title, track.source_url)
}

pub fn now_playing(track: &Track) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .title("🎵 Now Playing")
        .description(track_link(track))
        .color(GREEN)
        .field("Author", &track.author, true);

    if let Some(ref dur) = track.duration_display {
        embed = embed.field("Duration", dur, true);
    }
    if !track.requester.is_empty() {
        embed = embed.field("Requested by", &track.requester, true);
    }
    if let Some(ref thumb) = track.thumbnail_url {
        embed = embed.thumbnail(thumb);
    }
    embed
}

pub fn added_to_queue(track: &Track, position: usize) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .title("✅ Added to Queue")
        .description(track_link(track))
        .color(BLURPLE);

    if let Some(ref dur) = track.duration_display {
        embed = embed.field("Duration", dur, true);
    }

    embed = embed.field("Position", format!("#{position}"), true);
    embed
}

/// Reply for a whole playlist. `started` is set when its first track began playing.
pub fn playlist_added(name: &str, count: usize, started: Option<&Track>) -> CreateEmbed {
    let noun = if count == 1 { "song" } else { "songs" };
    let mut embed = CreateEmbed::new()
        .title("📃 Playlist Added")
        .description(format!("Added **{name}** playlist ({count} {noun}) to queue"))
        .color(BLURPLE);

    if let Some(track) = started {
        embed = embed.field("Now Playing", track_link(track), false);
        if let Some(ref thumb) = track.thumbnail_url {
            embed = embed.thumbnail(thumb);
        }
    }
    embed
}

pub fn queue_list(
    current: Option<&Track>,
    tracks: &[Track],
    loop_mode: LoopMode,
    page: usize,
) -> CreateEmbed {
    let per_page = 10;
    let total_pages = tracks.len().div_ceil(per_page).max(1);
    let page = page.clamp(1, total_pages);

    let mut description = String::new();

    if let Some(track) = current {
        description.push_str(&format!(
            "**Now playing:** {}{}\n\n",
            track_link(track),
            track
                .duration_display
                .as_ref()
                .map_or(String::new(), |d| format!(" `{d}`"))
        ));
    }

    if tracks.is_empty() {
        description.push_str("The queue is empty.");
    } else {
        let start = (page - 1) * per_page;
        let end = (start + per_page).min(tracks.len());

        for (i, track) in tracks[start..end].iter().enumerate() {
            let num = start + i + 1;
            let dur = track
                .duration_display
                .as_ref()
                .map_or(String::new(), |d| format!(" `{d}`"));
            description.push_str(&format!("**{num}.** {}{dur}\n", track_link(track)));
        }
    }

    CreateEmbed::new()
        .title(format!("📋 Queue ({page}/{total_pages})"))
        .description(description)
        .color(BLURPLE)
        .footer(CreateEmbedFooter::new(format!(
            "{} tracks · Loop: {loop_mode}",
            tracks.len()
        )))
}

pub fn radio(session: &RadioSession, changed: bool) -> CreateEmbed {
    let title = if changed {
        "📻 Radio Changed"
    } else {
        "📻 Radio Started"
    };
    CreateEmbed::new()
        .title(title)
        .description(format!("**{}**\n{}", session.label, session.stream_url))
        .color(GREEN)
        .footer(CreateEmbedFooter::new("Playing 24/7. Use /stop to end it."))
}

pub fn info(title: &str, message: &str) -> CreateEmbed {
    CreateEmbed::new()
        .title(title)
        .description(message)
        .color(BLURPLE)
}

pub fn warning(message: &str) -> CreateEmbed {
    CreateEmbed::new()
        .title("⚠️ Warning")
        .description(message)
        .color(YELLOW)
}

pub fn error(message: &str) -> CreateEmbed {
    CreateEmbed::new()
        .title("❌ Error")
        .description(message)
        .color(RED)
}
