use serde::{Deserialize, Serialize};
use trkcore::geometry::wafer::WaferId;

use crate::segment::candidate::FitCandidate;
use crate::segment::record::ClusterRecord;

/// One measurement point of an output track.
///
/// The first state of every track is synthetic: it sits at the station
/// reference z, carries the fitted (x, y) as its position and has no
/// cluster.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackState {
    pub z: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wafer: Option<WaferId>,
    pub local_position: [f64; 2],
    pub local_covariance: [[f64; 2]; 2],
}

/// Straight-line segment within one station.
///
/// `params` are `(x0, y0, tx, ty)` at `z_reference`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentTrack {
    pub station: u8,
    pub chi2: f64,
    pub ndof: usize,
    pub z_reference: f64,
    pub params: [f64; 4],
    pub covariance: [[f64; 4]; 4],
    pub states: Vec<TrackState>,
}

impl SegmentTrack {
    pub fn from_candidate(station: u8, candidate: &FitCandidate, records: &[ClusterRecord], z_center: f64) -> Self {
        let fit = &candidate.fit;
        let cov = &fit.covariance;

        let mut states = Vec::with_capacity(candidate.n_clusters() + 1);
        states.push(TrackState {
            z: z_center,
            cluster_id: None,
            wafer: None,
            local_position: [fit.params[0], fit.params[1]],
            local_covariance: [[cov[(0, 0)], cov[(0, 1)]], [cov[(1, 0)], cov[(1, 1)]]],
        });

        let mut members: Vec<&ClusterRecord> = candidate.members().map(|m| &records[m]).collect();
        members.sort_by(|a, b| a.z.total_cmp(&b.z).then(a.index.cmp(&b.index)));
        states.extend(members.into_iter().map(|r| TrackState {
            z: r.z,
            cluster_id: Some(r.cluster_id),
            wafer: Some(r.wafer),
            local_position: r.local_position,
            local_covariance: r.local_covariance,
        }));

        let mut covariance = [[0.0; 4]; 4];
        for (i, row) in covariance.iter_mut().enumerate() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = cov[(i, j)];
            }
        }

        Self {
            station,
            chi2: fit.chi2,
            ndof: candidate.ndof(),
            z_reference: z_center,
            params: [fit.params[0], fit.params[1], fit.params[2], fit.params[3]],
            covariance,
            states,
        }
    }

    pub fn n_clusters(&self) -> usize {
        self.states.len().saturating_sub(1)
    }

    pub fn cluster_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.states.iter().filter_map(|s| s.cluster_id)
    }

    /// (x, y) of the segment at `z`.
    pub fn position_at(&self, z: f64) -> [f64; 2] {
        let dz = z - self.z_reference;
        [self.params[0] + self.params[2] * dz, self.params[1] + self.params[3] * dz]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{layout, line_clusters, records, Line};

    #[test]
    fn test_track_states() {
        let geo = layout();
        let line = Line::new(-15.0, 40.0, 0.003, -0.001);
        let clusters = line_clusters(&geo, 3, &line, 50);
        let recs = records(&geo, &clusters);
        let zc = 2000.0;
        let candidate = FitCandidate::from_members(&[0, 1, 2, 3, 4, 5], &recs, zc);
        let track = SegmentTrack::from_candidate(3, &candidate, &recs, zc);

        assert_eq!(track.station, 3);
        assert_eq!(track.ndof, 2);
        assert_eq!(track.states.len(), 7);
        assert_eq!(track.n_clusters(), 6);

        let first = &track.states[0];
        assert_eq!(first.z, zc);
        assert!(first.cluster_id.is_none());
        assert!((first.local_position[0] + 15.0).abs() < 1e-5);
        assert!(first.local_covariance[0][0] > 0.0);

        for w in track.states[1..].windows(2) {
            assert!(w[0].z <= w[1].z);
        }
        let mut ids: Vec<u64> = track.cluster_ids().collect();
        ids.sort_unstable();
        assert_eq!(ids, (50..56).collect::<Vec<_>>());

        let [x, y] = track.position_at(zc + 100.0);
        assert!((x - (-15.0 + 0.3)).abs() < 1e-4);
        assert!((y - (40.0 - 0.1)).abs() < 1e-5);
    }

    #[test]
    fn test_serialized_synthetic_state_has_no_cluster() {
        let geo = layout();
        let clusters = line_clusters(&geo, 0, &Line::new(5.0, 5.0, 0.0, 0.0), 0);
        let recs = records(&geo, &clusters);
        let candidate = FitCandidate::from_members(&[0, 1, 2, 3, 4, 5], &recs, -1000.0);
        let track = SegmentTrack::from_candidate(0, &candidate, &recs, -1000.0);
        let json = serde_json::to_value(&track).unwrap();
        assert!(json["states"][0].get("cluster_id").is_none());
        assert!(json["states"][1].get("cluster_id").is_some());
        let back: SegmentTrack = serde_json::from_value(json).unwrap();
        assert_eq!(back.states.len(), track.states.len());
        assert_eq!(back.cluster_ids().collect::<Vec<_>>(), track.cluster_ids().collect::<Vec<_>>());
        assert!(back.states[0].wafer.is_none());
    }
}
