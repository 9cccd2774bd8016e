use ratatui::style::Color;

pub const ACCENT: Color = Color::Cyan;
pub const STEELBLUE: Color = Color::Rgb(0x46, 0x82, 0xB4);
pub const SILVER: Color = Color::Rgb(0xC0, 0xC0, 0xC0);

pub fn state_color(state: &str) -> Color {
    match state {
        "New" | "Proposed" | "To Do" => Color::Gray,
        "Active" | "In Progress" | "Committed" | "Doing" => Color::Cyan,
        "Resolved" | "Done" => Color::Green,
        "Closed" | "Removed" | "Cancelled" => Color::DarkGray,
        _ => Color::White,
    }
}

pub fn type_color(work_item_type: &str) -> Color {
    match work_item_type {
        "Epic" => Color::Rgb(0xFF, 0x7B, 0x00),
        "Feature" => Color::Rgb(0x77, 0x3B, 0x93),
        "User Story" | "Product Backlog Item" => Color::Rgb(0x00, 0x98, 0xC7),
        "Task" => Color::Rgb(0xF2, 0xCB, 0x1D),
        "Bug" => Color::Rgb(0xCC, 0x29, 0x3D),
        _ => Color::Gray,
    }
}
