use serenity::builder::{
    CreateActionRow, CreateButton, CreateSelectMenu, CreateSelectMenuKind,
    CreateSelectMenuOption,
};
use serenity::model::application::ButtonStyle;

use crate::music::Track;

pub const PAUSE: &str = "music_pause";
pub const RESUME: &str = "music_resume";
pub const SKIP: &str = "music_skip";
pub const STOP: &str = "music_stop";
pub const QUEUE_SELECT: &str = "music_queue_select";

pub fn music_buttons(is_paused: bool) -> CreateActionRow {
    let pause_resume = if is_paused {
        CreateButton::new(RESUME)
            .label("Resume")
            .emoji('▶')
            .style(ButtonStyle::Success)
    } else {
        CreateButton::new(PAUSE)
            .label("Pause")
            .emoji('⏸')
            .style(ButtonStyle::Primary)
    };

    let skip = CreateButton::new(SKIP)
        .label("Skip")
        .emoji('⏭')
        .style(ButtonStyle::Secondary);

    let stop = CreateButton::new(STOP)
        .label("Stop")
        .emoji('⏹')
        .style(ButtonStyle::Danger);

    CreateActionRow::Buttons(vec![pause_resume, skip, stop])
}

pub fn music_buttons_disabled() -> CreateActionRow {
    CreateActionRow::Buttons(vec![
        CreateButton::new(PAUSE)
            .label("Pause")
            .emoji('⏸')
            .style(ButtonStyle::Primary)
            .disabled(true),
        CreateButton::new(SKIP)
            .label("Skip")
            .emoji('⏭')
            .style(ButtonStyle::Secondary)
            .disabled(true),
        CreateButton::new(STOP)
            .label("Stop")
            .emoji('⏹')
            .style(ButtonStyle::Danger)
            .disabled(true),
    ])
}

pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}

fn queue_select_menu(upcoming: &[Track]) -> CreateActionRow {
    let count = upcoming.len().min(25);
    let options: Vec<CreateSelectMenuOption> = upcoming
        .iter()
        .take(25)
        .enumerate()
        .map(|(i, track)| {
            let label = truncate_str(&track.title, 100);
            let desc = match &track.duration_display {
                Some(d) => format!("#{} · {d}", i + 1),
                None => format!("#{}", i + 1),
            };
            CreateSelectMenuOption::new(label, format!("queue_{i}"))
                .description(truncate_str(&desc, 100))
        })
        .collect();

    let placeholder = if upcoming.len() > 25 {
        format!("Up next ({count}/{} tracks)", upcoming.len())
    } else {
        format!("Up next ({count} tracks)")
    };

    let menu = CreateSelectMenu::new(QUEUE_SELECT, CreateSelectMenuKind::String { options })
        .placeholder(placeholder);

    CreateActionRow::SelectMenu(menu)
}

pub fn music_components(is_paused: bool, upcoming: &[Track]) -> Vec<CreateActionRow> {
    let mut rows = vec![music_buttons(is_paused)];
    if !upcoming.is_empty() {
        rows.push(queue_select_menu(upcoming));
    }
    rows
}

pub fn music_components_disabled() -> Vec<CreateActionRow> {
    vec![music_buttons_disabled()]
}
