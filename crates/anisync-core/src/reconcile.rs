use tracing::debug;

use anisync_models::{LibrarySeason, LibraryShow, TrackingList, UpdateCandidate, WatchStatus};

use crate::mapping::MappingTable;

/// Status MAL should show for a season given the library's watched count
pub fn status_for(watched: u32, total: Option<u32>) -> WatchStatus {
    match total {
        Some(total) if total > 0 && watched >= total => WatchStatus::Completed,
        _ if watched != 0 => WatchStatus::Watching,
        _ => WatchStatus::ToWatch,
    }
}

/// Decide whether a season's MAL entry is behind the library.
///
/// Seasons already caught up on MAL, or whose MAL count equals the total
/// MAL reports, are left alone. The total is compared as reported, so a
/// listed airing show at 0 of 0 is skipped too.
pub fn needs_update(
    show: &LibraryShow,
    season: &LibrarySeason,
    tracking_id: Option<&str>,
    list: &TrackingList,
) -> Option<UpdateCandidate> {
    let tracking_id = tracking_id?;
    let watched = season.watched_count();

    let entry = list.get(tracking_id);
    let tracking_watched = entry.map(|e| e.num_watched_episodes).unwrap_or(0);
    let total = entry.and_then(|e| e.anime_num_episodes);

    let caught_up = entry.is_some() && watched <= tracking_watched;
    let finished = total == Some(tracking_watched);
    if caught_up || finished {
        return None;
    }

    Some(UpdateCandidate {
        title: show.title.clone(),
        season: season.number,
        library_id: show.library_id.clone(),
        tracking_id: tracking_id.to_string(),
        watched_episodes: watched,
        tracking_watched_episodes: tracking_watched,
    })
}

/// Candidates for every mapped season, in show then season order
pub fn compute_candidates(
    shows: &[LibraryShow],
    mappings: &MappingTable,
    list: &TrackingList,
) -> Vec<UpdateCandidate> {
    let mut candidates = Vec::new();
    for show in shows {
        for season in &show.seasons {
            let tracking_id = mappings.get(&show.library_id, season.number);
            if tracking_id.is_none() {
                debug!("Unmapped season for {} season: {}", show.title, season.number);
            }
            candidates.extend(needs_update(show, season, tracking_id, list));
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{show, tracked};

    #[test]
    fn test_status_for() {
        assert_eq!(status_for(0, None), WatchStatus::ToWatch);
        assert_eq!(status_for(0, Some(12)), WatchStatus::ToWatch);
        assert_eq!(status_for(3, None), WatchStatus::Watching);
        assert_eq!(status_for(3, Some(12)), WatchStatus::Watching);
        assert_eq!(status_for(12, Some(12)), WatchStatus::Completed);
        assert_eq!(status_for(13, Some(12)), WatchStatus::Completed);
        // An unknown total reported as 0 never completes
        assert_eq!(status_for(5, Some(0)), WatchStatus::Watching);
    }

    #[test]
    fn test_unlisted_season_with_progress_is_a_candidate() {
        let s = show("267440", "Attack on Titan", &[(1, 3, 25)]);
        let candidate = needs_update(&s, &s.seasons[0], Some("16498"), &TrackingList::new()).unwrap();

        assert_eq!(candidate.tracking_id, "16498");
        assert_eq!(candidate.watched_episodes, 3);
        assert_eq!(candidate.tracking_watched_episodes, 0);
        assert_eq!(candidate.season, 1);
    }

    #[test]
    fn test_caught_up_entry_is_skipped() {
        let s = show("267440", "Attack on Titan", &[(1, 5, 25)]);
        let list = tracked(&[("16498", 5, Some(25))]);
        assert!(needs_update(&s, &s.seasons[0], Some("16498"), &list).is_none());

        let ahead = tracked(&[("16498", 7, Some(25))]);
        assert!(needs_update(&s, &s.seasons[0], Some("16498"), &ahead).is_none());
    }

    #[test]
    fn test_finished_entry_is_skipped() {
        let s = show("76885", "Cowboy Bebop", &[(1, 26, 26)]);
        let list = tracked(&[("1", 26, Some(26))]);
        assert!(needs_update(&s, &s.seasons[0], Some("1"), &list).is_none());
    }

    #[test]
    fn test_library_ahead_of_finished_entry_is_skipped() {
        // Library counts extra episodes MAL does not know about
        let s = show("76885", "Cowboy Bebop", &[(1, 14, 14)]);
        let list = tracked(&[("1", 12, Some(12))]);
        assert!(needs_update(&s, &s.seasons[0], Some("1"), &list).is_none());
    }

    #[test]
    fn test_listed_airing_entry_at_zero_is_skipped() {
        let s = show("81797", "One Piece", &[(1, 3, 10)]);
        let list = tracked(&[("21", 0, Some(0))]);
        assert!(needs_update(&s, &s.seasons[0], Some("21"), &list).is_none());

        // Once MAL has progress the airing total no longer matches
        let progressed = tracked(&[("21", 1, Some(0))]);
        let candidate = needs_update(&s, &s.seasons[0], Some("21"), &progressed).unwrap();
        assert_eq!(candidate.tracking_watched_episodes, 1);
    }

    #[test]
    fn test_behind_entry_is_a_candidate() {
        let s = show("81797", "One Piece", &[(1, 40, 61)]);
        let list = tracked(&[("21", 12, None)]);
        let candidate = needs_update(&s, &s.seasons[0], Some("21"), &list).unwrap();
        assert_eq!(candidate.tracking_watched_episodes, 12);
    }

    #[test]
    fn test_unlisted_season_without_progress_is_still_a_candidate() {
        let s = show("81797", "One Piece", &[(1, 0, 61)]);
        assert!(needs_update(&s, &s.seasons[0], Some("21"), &TrackingList::new()).is_some());
        assert!(needs_update(&s, &s.seasons[0], None, &TrackingList::new()).is_none());
    }

    #[test]
    fn test_compute_candidates_keeps_discovery_order() {
        let shows = vec![
            show("2", "Second", &[(2, 1, 10), (1, 1, 10)]),
            show("1", "First", &[(1, 4, 12), (2, 0, 12)]),
        ];
        let mut mappings = MappingTable::new();
        mappings.set("2", 1, "201");
        mappings.set("2", 2, "202");
        mappings.set("1", 1, "101");

        let candidates = compute_candidates(&shows, &mappings, &TrackingList::new());
        let ids: Vec<&str> = candidates.iter().map(|c| c.tracking_id.as_str()).collect();
        assert_eq!(ids, vec!["201", "202", "101"]);
    }
}
