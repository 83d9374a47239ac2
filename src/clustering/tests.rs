#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use crate::clustering::{
        cluster_by_time, density_memberships, fold_unclustered, group_by_label,
        partition_events, target_window_count, Grouping, Membership, TimeWindow,
    };
    use crate::config::PipelineConfig;
    use crate::event::Event;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn event(date: NaiveDate, description: &str) -> Event {
        Event::new(date, description)
    }

    /// 40 events: four bands of ten, half a year apart, three days between events.
    fn two_years_of_events() -> Vec<Event> {
        let start = day(2023, 1, 1);
        let mut events = Vec::new();
        for band in 0..4 {
            for i in 0..10 {
                let date = start + Duration::days(band * 180 + i * 3);
                events.push(event(date, &format!("band {} event {}", band, i)));
            }
        }
        events
    }

    fn assert_partition(windows: &[TimeWindow], total: usize) {
        let covered: usize = windows.iter().map(TimeWindow::len).sum();
        assert_eq!(covered, total);
        for pair in windows.windows(2) {
            assert!(pair[0].end < pair[1].start, "windows overlap or are out of order");
        }
        for window in windows {
            assert!(!window.is_empty());
            assert!(window.events.iter().all(|e| e.date >= window.start && e.date <= window.end));
        }
    }

    #[test]
    fn test_target_window_count_caps() {
        let week: Vec<Event> = (0..7)
            .map(|i| event(day(2025, 6, 1) + Duration::days(i), "x"))
            .collect();
        assert_eq!(target_window_count(&week, 4, 7), 1);
        assert_eq!(target_window_count(&two_years_of_events(), 4, 7), 4);

        let two_dates = vec![event(day(2025, 1, 1), "a"), event(day(2025, 6, 1), "b")];
        assert_eq!(target_window_count(&two_dates, 4, 7), 2);
        assert_eq!(target_window_count(&[], 4, 7), 0);
    }

    #[test]
    fn test_single_event_gives_one_window() {
        let windows =
            cluster_by_time(vec![event(day(2024, 3, 5), "only")], &PipelineConfig::default())
                .unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].start, day(2024, 3, 5));
        assert_eq!(windows[0].end, day(2024, 3, 5));
    }

    #[test]
    fn test_one_week_collapses_to_one_window() {
        let events: Vec<Event> = (0..10)
            .map(|i| event(day(2025, 6, 22) + Duration::days(i % 7), &format!("e{}", i)))
            .collect();
        let windows = cluster_by_time(events, &PipelineConfig::default()).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].len(), 10);
        assert_eq!(windows[0].start, day(2025, 6, 22));
        assert_eq!(windows[0].end, day(2025, 6, 28));
    }

    #[test]
    fn test_two_years_gives_four_ordered_windows() {
        let events = two_years_of_events();
        let windows = cluster_by_time(events, &PipelineConfig::default()).unwrap();
        assert_eq!(windows.len(), 4);
        assert_partition(&windows, 40);
        for (band, window) in windows.iter().enumerate() {
            assert_eq!(window.len(), 10);
            assert!(window
                .events
                .iter()
                .all(|e| e.description.starts_with(&format!("band {} ", band))));
        }
    }

    #[test]
    fn test_unsorted_input_still_ordered() {
        let mut events = two_years_of_events();
        events.reverse();
        let windows = cluster_by_time(events, &PipelineConfig::default()).unwrap();
        assert_partition(&windows, 40);
        for window in &windows {
            for pair in window.events.windows(2) {
                assert!(pair[0].date <= pair[1].date);
            }
        }
    }

    #[test]
    fn test_fewer_distinct_dates_than_target() {
        let events = vec![
            event(day(2025, 1, 1), "a"),
            event(day(2025, 1, 1), "b"),
            event(day(2025, 1, 1), "c"),
            event(day(2025, 6, 1), "d"),
            event(day(2025, 6, 1), "e"),
        ];
        let windows = cluster_by_time(events, &PipelineConfig::default()).unwrap();
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].len(), 3);
        assert_eq!(windows[1].len(), 2);
    }

    #[test]
    fn test_density_marks_outlier_as_unclustered() {
        let vectors = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.99, 0.1, 0.0],
            vec![1.0, 0.05, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.1, 0.99, 0.0],
            vec![0.05, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ];
        let memberships = density_memberships(&vectors, 2, 0.5).unwrap();
        assert_eq!(memberships[6], Membership::Unclustered);
        assert!(matches!(memberships[0], Membership::Assigned(_)));
        assert_eq!(memberships[0], memberships[1]);
        assert_eq!(memberships[3], memberships[4]);
        assert_ne!(memberships[0], memberships[3]);
    }

    #[test]
    fn test_density_rejects_ragged_vectors() {
        let vectors = vec![vec![1.0, 0.0], vec![1.0]];
        assert!(density_memberships(&vectors, 2, 0.5).is_err());
    }

    #[test]
    fn test_noise_folds_into_nearest_cluster() {
        let vectors = vec![
            vec![0.0, 0.0],
            vec![0.0, 0.2],
            vec![5.0, 5.0],
            vec![5.0, 5.2],
            vec![4.0, 4.0],
        ];
        let memberships = vec![
            Membership::Assigned(0),
            Membership::Assigned(0),
            Membership::Assigned(1),
            Membership::Assigned(1),
            Membership::Unclustered,
        ];
        let labels = fold_unclustered(&vectors, &memberships).unwrap();
        assert_eq!(labels, vec![0, 0, 1, 1, 1]);
    }

    #[test]
    fn test_noise_tie_goes_to_lowest_cluster() {
        let vectors = vec![vec![-1.0], vec![1.0], vec![0.0]];
        let memberships = vec![
            Membership::Assigned(3),
            Membership::Assigned(1),
            Membership::Unclustered,
        ];
        assert_eq!(fold_unclustered(&vectors, &memberships), Some(vec![3, 1, 1]));
    }

    #[test]
    fn test_single_cluster_or_all_noise_collapses() {
        let vectors = vec![vec![0.0], vec![0.1], vec![9.0]];
        let one = vec![
            Membership::Assigned(0),
            Membership::Assigned(0),
            Membership::Unclustered,
        ];
        assert_eq!(fold_unclustered(&vectors, &one), None);
        let none = vec![Membership::Unclustered; 3];
        assert_eq!(fold_unclustered(&vectors, &none), None);
    }

    #[test]
    fn test_groups_ordered_by_earliest_event() {
        let events = vec![
            event(day(2025, 3, 1), "late topic a"),
            event(day(2025, 1, 1), "early topic b"),
            event(day(2025, 3, 2), "late topic a again"),
        ];
        let groups = group_by_label(&events, &[0, 1, 0]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].events[0].description, "early topic b");
        assert_eq!(groups[1].events.len(), 2);
    }

    #[test]
    fn test_partition_events_by_topic() {
        let events: Vec<Event> = (0..6)
            .map(|i| event(day(2025, 5, 1) + Duration::days(i), &format!("e{}", i)))
            .collect();
        let embeddings: Vec<Vec<f32>> = (0..6)
            .map(|i| if i % 2 == 0 { vec![1.0, 0.0] } else { vec![0.0, 1.0] })
            .collect();
        let (groups, grouping) = partition_events(&events, &embeddings, &PipelineConfig::default());
        assert_eq!(grouping, Grouping::Clustered(2));
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].events[0].description, "e0");
        assert_eq!(groups[0].events.len() + groups[1].events.len(), 6);
    }

    #[test]
    fn test_partition_near_duplicates_collapses() {
        let events: Vec<Event> = (0..4)
            .map(|i| event(day(2025, 5, 1), &format!("same story {}", i)))
            .collect();
        let embeddings = vec![vec![1.0, 0.01]; 4];
        let (groups, grouping) = partition_events(&events, &embeddings, &PipelineConfig::default());
        assert_eq!(grouping, Grouping::Collapsed);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].events.len(), 4);
    }

    #[test]
    fn test_default_radius_groups_loosely_related_reports() {
        // Within a topic the vectors sit at cosine 0.75 from each other, across
        // topics below 0.2.
        let spread = [(0.447, 0.0), (-0.224, 0.387), (-0.224, -0.387)];
        let offset = [(0.224, 0.387), (-0.447, 0.0), (0.224, -0.387)];
        let mut embeddings: Vec<Vec<f32>> = Vec::new();
        for (x, y) in spread {
            embeddings.push(vec![1.0, 0.0, x, y]);
        }
        for (x, y) in offset {
            embeddings.push(vec![0.0, 1.0, x, y]);
        }
        let events: Vec<Event> = (0..6)
            .map(|i| event(day(2025, 5, 1) + Duration::days(i), &format!("report {}", i)))
            .collect();

        let (groups, grouping) = partition_events(&events, &embeddings, &PipelineConfig::default());
        assert_eq!(grouping, Grouping::Clustered(2));
        assert_eq!(groups[0].events.len(), 3);
        assert_eq!(groups[1].events.len(), 3);
        assert_eq!(groups[0].events[0].description, "report 0");
    }
}
