//! Single-pass greedy grouping of nearby stops.
//!
//! Membership is tested against the seed stop only, never transitively against
//! later members, so a chain of stops spaced at the threshold splits.

use crate::haversine::haversine_km;
use crate::types::Stop;

/// Group stop indices. Each unvisited stop, in input order, seeds a cluster
/// with every other unvisited stop within `max_distance_km` of it.
pub fn cluster_stops(stops: &[Stop], max_distance_km: f64) -> Vec<Vec<usize>> {
    let mut used = vec![false; stops.len()];
    let mut clusters = Vec::new();

    for (index, seed) in stops.iter().enumerate() {
        if used[index] {
            continue;
        }
        used[index] = true;
        let mut cluster = vec![index];

        for (other_index, other) in stops.iter().enumerate() {
            if used[other_index] {
                continue;
            }
            if haversine_km(seed.location(), other.location()) <= max_distance_km {
                used[other_index] = true;
                cluster.push(other_index);
            }
        }

        clusters.push(cluster);
    }

    clusters
}

/// Collapse each cluster into one representative at the centroid.
///
/// The representative keeps the seed stop's identity and attributes and
/// carries the total `cluster_size` of its members.
pub fn collapse_clusters(stops: &[Stop], clusters: &[Vec<usize>]) -> Vec<Stop> {
    clusters
        .iter()
        .filter_map(|members| {
            let seed = stops.get(*members.first()?)?;
            let count = members.len() as f64;
            let lat = members.iter().map(|&i| stops[i].lat).sum::<f64>() / count;
            let lng = members.iter().map(|&i| stops[i].lng).sum::<f64>() / count;
            let cluster_size = members.iter().map(|&i| stops[i].cluster_size).sum();

            Some(Stop {
                lat,
                lng,
                cluster_size,
                ..seed.clone()
            })
        })
        .collect()
}

/// Cluster and collapse in one step.
pub fn representatives(stops: &[Stop], max_distance_km: f64) -> Vec<Stop> {
    let clusters = cluster_stops(stops, max_distance_km);
    collapse_clusters(stops, &clusters)
}
