use chess_core::logic::game::GameSession;
use shakmaty::{File, Rank, Square};
use std::fmt::Write;

const FILES: &str = "    a b c d e f g h";

/// Text diagram of the board, Black at the top. Squares in `marked` are
/// shown as `*` when empty and prefixed with `*` when occupied.
pub fn render(session: &GameSession, marked: &[Square]) -> String {
    let grid = session.board();
    let mut out = String::new();
    let _ = writeln!(out, "{FILES}");

    for (rank_index, row) in grid.iter().enumerate().rev() {
        let label = rank_index + 1;
        let _ = write!(out, " {label} ");
        for (file_index, cell) in row.iter().enumerate() {
            let square = square_at(file_index, rank_index);
            let is_marked = square.is_some_and(|sq| marked.contains(&sq));
            let symbol = cell.map_or('.', |piece| piece.char());
            let prefix = if is_marked { '*' } else { ' ' };
            if is_marked && cell.is_none() {
                out.push_str(" *");
            } else {
                out.push(prefix);
                out.push(symbol);
            }
        }
        let _ = writeln!(out, "  {label}");
    }

    let _ = write!(out, "{FILES}");
    out
}

fn square_at(file_index: usize, rank_index: usize) -> Option<Square> {
    let file = u32::try_from(file_index).ok().filter(|f| *f < 8)?;
    let rank = u32::try_from(rank_index).ok().filter(|r| *r < 8)?;
    Some(Square::from_coords(File::new(file), Rank::new(rank)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::settings::GameMode;

    #[test]
    fn start_position_layout() {
        let session = GameSession::new(GameMode::TwoPlayer);
        let text = render(&session, &[]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[1], " 8  r n b q k b n r  8");
        assert_eq!(lines[4], " 5  . . . . . . . .  5");
        assert_eq!(lines[8], " 1  R N B Q K B N R  1");
    }

    #[test]
    fn marked_squares_stand_out() {
        let session = GameSession::new(GameMode::TwoPlayer);
        let text = render(&session, &[Square::E4, Square::E2]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[5], " 4  . . . . * . . .  4");
        assert_eq!(lines[7], " 2  P P P P*P P P P  2");
    }
}
