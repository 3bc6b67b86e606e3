//! Distribution of seeds across groups.

use crate::models::ParticipantId;

/// Deal seeds into `group_count` groups in serpentine order
///
/// Seeds 1..g go to groups A..g, the next g back from the last group to A,
/// and so on, which keeps the seed strength of each group balanced.
pub fn snake_draw(seeds: &[ParticipantId], group_count: usize) -> Vec<Vec<ParticipantId>> {
    let group_count = group_count.max(1);
    let mut groups = vec![Vec::new(); group_count];

    for (idx, &participant_id) in seeds.iter().enumerate() {
        let row = idx / group_count;
        let col = idx % group_count;
        let target = if row % 2 == 0 {
            col
        } else {
            group_count - 1 - col
        };
        groups[target].push(participant_id);
    }

    groups
}

/// Display name for the group at `index`: "Group A", "Group B", ... "Group AA"
pub fn group_name(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    format!("Group {}", String::from_utf8_lossy(&letters))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_draw() {
        let seeds: Vec<ParticipantId> = (1..=12).collect();
        let groups = snake_draw(&seeds, 3);
        assert_eq!(groups[0], vec![1, 6, 7, 12]);
        assert_eq!(groups[1], vec![2, 5, 8, 11]);
        assert_eq!(groups[2], vec![3, 4, 9, 10]);
    }

    #[test]
    fn test_uneven_draw_keeps_everyone() {
        let seeds: Vec<ParticipantId> = (1..=7).collect();
        let groups = snake_draw(&seeds, 2);
        assert_eq!(groups[0], vec![1, 4, 5]);
        assert_eq!(groups[1], vec![2, 3, 6, 7]);
    }

    #[test]
    fn test_group_names() {
        assert_eq!(group_name(0), "Group A");
        assert_eq!(group_name(3), "Group D");
        assert_eq!(group_name(25), "Group Z");
        assert_eq!(group_name(26), "Group AA");
    }
}
