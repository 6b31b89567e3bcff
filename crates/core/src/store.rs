//! Per-patient episode store.
//!
//! One [`EpisodeStore`] holds the episodes of a single kind (chronic or pregnancy) for many
//! patients. It is the only component allowed to change an episode, and it enforces:
//!
//! - at most one Active episode per patient in this store,
//! - archived episodes are read-only,
//! - a visit append and its side effects on the episode land together or not at all.
//!
//! There is no ambient "selected episode": every command takes the episode id it targets, and
//! [`EpisodeStore::select_episode`] implements the default selection policy for callers that
//! have none.

use crate::config::CoreConfig;
use crate::encounter::{build_encounter, Encounter, VisitInput};
use crate::episode::{CareEpisode, EpisodeKind, EpisodePatch, NewEpisode};
use crate::sink::{NoopSink, PatientEpisodes, RecordSink};
use crate::{CareError, CareResult};
use care_uuid::RecordId;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;

/// Store of care episodes of one kind, keyed by patient.
pub struct EpisodeStore {
    kind: EpisodeKind,
    cfg: Arc<CoreConfig>,
    sink: Arc<dyn RecordSink>,
    /// Episodes per patient, most recently started first.
    patients: HashMap<RecordId, Vec<CareEpisode>>,
    /// Episode id to owning patient id.
    owners: HashMap<RecordId, RecordId>,
}

impl EpisodeStore {
    /// Creates an empty store for episodes of `kind`.
    pub fn new(kind: EpisodeKind, cfg: Arc<CoreConfig>) -> Self {
        Self {
            kind,
            cfg,
            sink: Arc::new(NoopSink),
            patients: HashMap::new(),
            owners: HashMap::new(),
        }
    }

    /// Routes committed changes to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Rebuilds a store from previously persisted episodes.
    ///
    /// # Errors
    ///
    /// Returns a `CareError` if an episode is of another kind, if an id appears twice, or if a
    /// patient would end up with more than one Active episode.
    pub fn from_episodes(
        kind: EpisodeKind,
        cfg: Arc<CoreConfig>,
        episodes: impl IntoIterator<Item = CareEpisode>,
    ) -> CareResult<Self> {
        let mut store = Self::new(kind, cfg);

        for episode in episodes {
            if episode.kind() != kind {
                return Err(CareError::EpisodeKindMismatch {
                    expected: kind,
                    actual: episode.kind(),
                });
            }
            if store.owners.contains_key(&episode.id()) {
                return Err(CareError::InvalidInput(format!(
                    "duplicate episode id {}",
                    episode.id()
                )));
            }
            if episode.is_active() {
                if let Some(active) = store.active_episode(episode.patient_id()) {
                    return Err(CareError::ActiveEpisodeExists {
                        patient_id: episode.patient_id(),
                        kind,
                        episode_id: active.id(),
                    });
                }
            }

            store.owners.insert(episode.id(), episode.patient_id());
            store
                .patients
                .entry(episode.patient_id())
                .or_default()
                .push(episode);
        }

        for episodes in store.patients.values_mut() {
            episodes.sort_by(|a, b| b.start_date().cmp(&a.start_date()));
        }

        Ok(store)
    }

    pub fn kind(&self) -> EpisodeKind {
        self.kind
    }

    /// All episodes for a patient, most recently started first.
    pub fn episodes_for(&self, patient_id: RecordId) -> &[CareEpisode] {
        self.patients
            .get(&patient_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn get(&self, episode_id: RecordId) -> Option<&CareEpisode> {
        let patient_id = self.owners.get(&episode_id)?;
        self.episodes_for(*patient_id)
            .iter()
            .find(|e| e.id() == episode_id)
    }

    /// The patient's Active episode, if any.
    pub fn active_episode(&self, patient_id: RecordId) -> Option<&CareEpisode> {
        self.episodes_for(patient_id).iter().find(|e| e.is_active())
    }

    /// Starts a new Active episode for `patient_id`.
    ///
    /// Derived baseline fields (such as the expected delivery date) are computed here. The new
    /// episode is placed at the head of the patient's list.
    ///
    /// # Errors
    ///
    /// - [`CareError::ActiveEpisodeExists`] if the patient already has an Active episode.
    /// - [`CareError::EpisodeKindMismatch`] if `initial` is for another episode kind.
    /// - [`CareError::MissingDiagnosis`] / [`CareError::MissingLastMenstrualPeriod`] or other
    ///   validation errors if mandatory fields are missing or invalid.
    pub fn start_episode(
        &mut self,
        patient_id: RecordId,
        initial: NewEpisode,
    ) -> CareResult<CareEpisode> {
        if let Some(active) = self.active_episode(patient_id) {
            tracing::warn!(
                "rejected start of {} episode: patient {} already has active episode {}",
                self.kind,
                patient_id,
                active.id()
            );
            return Err(CareError::ActiveEpisodeExists {
                patient_id,
                kind: self.kind,
                episode_id: active.id(),
            });
        }
        if initial.kind() != self.kind {
            return Err(CareError::EpisodeKindMismatch {
                expected: self.kind,
                actual: initial.kind(),
            });
        }

        let episode = CareEpisode::start(patient_id, initial)?;
        self.owners.insert(episode.id(), patient_id);
        self.patients
            .entry(patient_id)
            .or_default()
            .insert(0, episode.clone());

        tracing::info!(
            "started {} episode {} for patient {}",
            self.kind,
            episode.id(),
            patient_id
        );
        self.notify(patient_id);

        Ok(episode)
    }

    /// Archives an Active episode, stamping its end date and optional outcome.
    ///
    /// Afterwards the patient has no Active episode of this kind; callers holding the archived
    /// id should re-select with [`select_episode`](Self::select_episode) or start a new one.
    ///
    /// # Errors
    ///
    /// - [`CareError::EpisodeArchived`] if the episode is already archived.
    /// - [`CareError::EpisodeNotFound`] if the id is unknown.
    pub fn archive_episode(
        &mut self,
        episode_id: RecordId,
        end_date: NaiveDate,
        outcome: Option<String>,
    ) -> CareResult<CareEpisode> {
        let archived = self.commit(episode_id, |next| {
            next.archive(end_date, outcome)?;
            Ok(next.clone())
        })?;

        tracing::info!(
            "archived {} episode {} on {}",
            self.kind,
            episode_id,
            end_date
        );
        Ok(archived)
    }

    /// Selects the episode a caller should work on.
    ///
    /// With an explicit `episode_id`, returns that episode if it belongs to the patient. With
    /// none, prefers the patient's Active episode, then the most recently started one.
    pub fn select_episode(
        &self,
        patient_id: RecordId,
        episode_id: Option<RecordId>,
    ) -> Option<&CareEpisode> {
        let episodes = self.episodes_for(patient_id);

        match episode_id {
            Some(id) => episodes.iter().find(|e| e.id() == id),
            None => episodes
                .iter()
                .find(|e| e.is_active())
                .or_else(|| episodes.iter().max_by_key(|e| e.start_date())),
        }
    }

    /// Applies a field, goal or list change to an Active episode.
    ///
    /// Diagnosis and risk-factor additions/removals are idempotent.
    ///
    /// # Errors
    ///
    /// - [`CareError::EpisodeArchived`] if the episode is archived.
    /// - [`CareError::EpisodeKindMismatch`] if the patch targets the other episode kind.
    /// - Validation errors from the patch content.
    pub fn mutate(&mut self, episode_id: RecordId, patch: EpisodePatch) -> CareResult<CareEpisode> {
        let updated = self.commit(episode_id, |next| {
            next.apply(patch)?;
            Ok(next.clone())
        })?;

        tracing::debug!("updated episode {}", episode_id);
        Ok(updated)
    }

    /// Appends a visit to an Active episode.
    ///
    /// Derived fields are computed from the episode as it is right now. Annual checkups marked
    /// as performed are stamped with the visit date on the episode in the same replacement.
    /// A visit with `finalizes_on` set also archives the pregnancy with that end date and the
    /// visit's outcome, so the stored gestational age and the episode end date always agree.
    ///
    /// # Errors
    ///
    /// - [`CareError::EpisodeArchived`] if the episode is archived.
    /// - [`CareError::MissingMeasurement`] if weight or blood pressure are absent.
    /// - [`CareError::InvalidInput`] if the visit predates the episode start or the
    ///   finalization date predates the visit.
    /// - Validation errors for malformed measurements.
    pub fn append_visit(
        &mut self,
        episode_id: RecordId,
        input: VisitInput,
    ) -> CareResult<Encounter> {
        let cfg = Arc::clone(&self.cfg);
        let finalizes_on = input.finalizes_on;
        let outcome = input.outcome.clone();

        let encounter = self.commit(episode_id, |next| {
            let encounter = build_encounter(next, input, &cfg)?;
            next.stamp_checkups(encounter.checkups_performed(), encounter.date());
            next.push_visit(encounter.clone());
            if let Some(end_date) = finalizes_on {
                next.archive(end_date, outcome)?;
            }
            Ok(encounter)
        })?;

        if let Some(end_date) = finalizes_on {
            tracing::info!(
                "archived {} episode {} on {} by final visit {}",
                self.kind,
                episode_id,
                end_date,
                encounter.id()
            );
        }

        match encounter.gestational_age() {
            Some(ga) => tracing::debug!(
                "visit {} on episode {} at gestational age {}",
                encounter.id(),
                episode_id,
                ga
            ),
            None => tracing::debug!("visit {} on episode {}", encounter.id(), episode_id),
        }
        Ok(encounter)
    }

    /// Runs `change` against a copy of the episode and swaps the copy in on success.
    ///
    /// The stored episode is never observed half-updated: on error nothing is replaced.
    fn commit<T>(
        &mut self,
        episode_id: RecordId,
        change: impl FnOnce(&mut CareEpisode) -> CareResult<T>,
    ) -> CareResult<T> {
        let patient_id = *self
            .owners
            .get(&episode_id)
            .ok_or(CareError::EpisodeNotFound(episode_id))?;
        let slot = self
            .patients
            .get_mut(&patient_id)
            .and_then(|episodes| episodes.iter_mut().find(|e| e.id() == episode_id))
            .ok_or(CareError::EpisodeNotFound(episode_id))?;

        if let Err(err) = slot.ensure_active() {
            tracing::warn!("rejected change to archived episode {}", episode_id);
            return Err(err);
        }

        let mut next = slot.clone();
        let result = change(&mut next)?;
        *slot = next;

        self.notify(patient_id);
        Ok(result)
    }

    fn notify(&self, patient_id: RecordId) {
        self.sink.on_update_patient(&PatientEpisodes {
            patient_id,
            kind: self.kind,
            episodes: self.episodes_for(patient_id),
        });
    }
}

impl std::fmt::Debug for EpisodeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EpisodeStore")
            .field("kind", &self.kind)
            .field("patients", &self.patients.len())
            .field("episodes", &self.owners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Locale;
    use crate::episode::{
        CheckupKind, EpisodeStatus, NewChronicEpisode, NewMedication, NewPregnancyEpisode,
        ObstetricHistory, TherapeuticGoals, VaccineKind,
    };
    use crate::scoring::obstetric::RiskFactor;
    use std::sync::Mutex;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn cfg() -> Arc<CoreConfig> {
        Arc::new(CoreConfig::new(Locale::Es))
    }

    fn chronic(start: &str, diagnoses: &[&str]) -> NewEpisode {
        NewEpisode::Chronic(NewChronicEpisode {
            start_date: date(start),
            diagnoses: diagnoses.iter().map(|d| d.to_string()).collect(),
            ..Default::default()
        })
    }

    fn pregnancy(start: &str, lmp: &str) -> NewEpisode {
        NewEpisode::Pregnancy(NewPregnancyEpisode {
            start_date: date(start),
            last_menstrual_period: Some(date(lmp)),
            ..Default::default()
        })
    }

    fn visit(on: &str) -> VisitInput {
        VisitInput {
            date: date(on),
            weight_kg: Some(70.0),
            blood_pressure: Some("130/85".into()),
            ..Default::default()
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        updates: Mutex<Vec<(RecordId, usize)>>,
    }

    impl RecordSink for RecordingSink {
        fn on_update_patient(&self, update: &PatientEpisodes<'_>) {
            self.updates
                .lock()
                .expect("sink mutex poisoned")
                .push((update.patient_id, update.episodes.len()));
        }
    }

    #[test]
    fn start_episode_inserts_active_episode_at_head() {
        let mut store = EpisodeStore::new(EpisodeKind::Chronic, cfg());
        let patient = RecordId::new();

        let first = store
            .start_episode(patient, chronic("2023-01-10", &["Diabetes Mellitus"]))
            .unwrap();
        store
            .archive_episode(first.id(), date("2023-12-01"), None)
            .unwrap();
        let second = store
            .start_episode(patient, chronic("2024-01-10", &["Diabetes Mellitus"]))
            .unwrap();

        let episodes = store.episodes_for(patient);
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].id(), second.id());
        assert_eq!(episodes[0].status(), EpisodeStatus::Active);
    }

    #[test]
    fn start_episode_rejects_second_active_episode() {
        let mut store = EpisodeStore::new(EpisodeKind::Chronic, cfg());
        let patient = RecordId::new();
        store
            .start_episode(patient, chronic("2024-01-10", &["Diabetes Mellitus"]))
            .unwrap();

        let err = store
            .start_episode(patient, chronic("2024-02-10", &["Dislipidemia"]))
            .unwrap_err();
        assert!(err.is_state());
        assert_eq!(store.episodes_for(patient).len(), 1);
    }

    #[test]
    fn start_episode_requires_kind_specific_fields() {
        let mut chronic_store = EpisodeStore::new(EpisodeKind::Chronic, cfg());
        let err = chronic_store
            .start_episode(RecordId::new(), chronic("2024-01-10", &[]))
            .unwrap_err();
        assert!(matches!(err, CareError::MissingDiagnosis));

        let mut pregnancy_store = EpisodeStore::new(EpisodeKind::Pregnancy, cfg());
        let err = pregnancy_store
            .start_episode(
                RecordId::new(),
                NewEpisode::Pregnancy(NewPregnancyEpisode {
                    start_date: date("2024-03-01"),
                    ..Default::default()
                }),
            )
            .unwrap_err();
        assert!(matches!(err, CareError::MissingLastMenstrualPeriod));
        assert!(err.is_validation());
    }

    #[test]
    fn start_episode_rejects_other_kind() {
        let mut store = EpisodeStore::new(EpisodeKind::Pregnancy, cfg());
        let err = store
            .start_episode(RecordId::new(), chronic("2024-01-10", &["Diabetes Mellitus"]))
            .unwrap_err();
        assert!(matches!(err, CareError::EpisodeKindMismatch { .. }));
    }

    #[test]
    fn start_pregnancy_derives_expected_delivery_date() {
        let mut store = EpisodeStore::new(EpisodeKind::Pregnancy, cfg());
        let episode = store
            .start_episode(RecordId::new(), pregnancy("2024-02-15", "2024-01-01"))
            .unwrap();
        assert_eq!(
            episode.pregnancy().unwrap().expected_delivery_date(),
            date("2024-10-07")
        );
    }

    #[test]
    fn archive_is_rejected_the_second_time() {
        let mut store = EpisodeStore::new(EpisodeKind::Chronic, cfg());
        let episode = store
            .start_episode(RecordId::new(), chronic("2024-01-10", &["Diabetes Mellitus"]))
            .unwrap();

        let archived = store
            .archive_episode(episode.id(), date("2024-06-01"), Some("Traslado".into()))
            .unwrap();
        assert_eq!(archived.status(), EpisodeStatus::Archived);
        assert_eq!(archived.outcome(), Some("Traslado"));

        let err = store
            .archive_episode(episode.id(), date("2024-07-01"), None)
            .unwrap_err();
        assert!(matches!(err, CareError::EpisodeArchived(_)));
        assert_eq!(
            store.get(episode.id()).unwrap().end_date(),
            Some(date("2024-06-01"))
        );
    }

    #[test]
    fn archive_unknown_episode_fails() {
        let mut store = EpisodeStore::new(EpisodeKind::Chronic, cfg());
        let err = store
            .archive_episode(RecordId::new(), date("2024-06-01"), None)
            .unwrap_err();
        assert!(matches!(err, CareError::EpisodeNotFound(_)));
    }

    #[test]
    fn at_most_one_active_episode_after_any_sequence() {
        let mut store = EpisodeStore::new(EpisodeKind::Chronic, cfg());
        let patient = RecordId::new();

        for year in 2019..2024 {
            let start = format!("{year}-01-01");
            let _ = store.start_episode(patient, chronic(&start, &["Diabetes Mellitus"]));
            let _ = store.start_episode(patient, chronic(&start, &["Dislipidemia"]));
            if year % 2 == 0 {
                let active = store.active_episode(patient).unwrap().id();
                store
                    .archive_episode(active, date(&format!("{year}-12-31")), None)
                    .unwrap();
            }
            let active_count = store
                .episodes_for(patient)
                .iter()
                .filter(|e| e.is_active())
                .count();
            assert!(active_count <= 1);
        }
    }

    #[test]
    fn select_prefers_active_then_most_recent() {
        let mut store = EpisodeStore::new(EpisodeKind::Chronic, cfg());
        let patient = RecordId::new();
        assert!(store.select_episode(patient, None).is_none());

        let old = store
            .start_episode(patient, chronic("2022-01-01", &["Diabetes Mellitus"]))
            .unwrap();
        store
            .archive_episode(old.id(), date("2022-12-31"), None)
            .unwrap();
        let newer = store
            .start_episode(patient, chronic("2023-01-01", &["Diabetes Mellitus"]))
            .unwrap();

        assert_eq!(store.select_episode(patient, None).unwrap().id(), newer.id());

        store
            .archive_episode(newer.id(), date("2023-12-31"), None)
            .unwrap();
        assert_eq!(store.select_episode(patient, None).unwrap().id(), newer.id());

        assert_eq!(
            store.select_episode(patient, Some(old.id())).unwrap().id(),
            old.id()
        );
        assert!(store
            .select_episode(RecordId::new(), Some(old.id()))
            .is_none());
    }

    #[test]
    fn mutate_rejects_archived_episode() {
        let mut store = EpisodeStore::new(EpisodeKind::Chronic, cfg());
        let episode = store
            .start_episode(RecordId::new(), chronic("2024-01-10", &["Diabetes Mellitus"]))
            .unwrap();
        store
            .archive_episode(episode.id(), date("2024-06-01"), None)
            .unwrap();

        let before = store.get(episode.id()).unwrap().clone();
        let patches = vec![
            EpisodePatch::AddDiagnosis("Hipertensión Arterial".into()),
            EpisodePatch::RemoveDiagnosis("Diabetes Mellitus".into()),
            EpisodePatch::SetGoals(TherapeuticGoals::default()),
            EpisodePatch::AddMedication(NewMedication {
                drug: "Metformina".into(),
                dose: "850mg".into(),
                frequency: "c/12h".into(),
                active: true,
            }),
            EpisodePatch::StampCheckup {
                checkup: CheckupKind::FootExam,
                date: date("2024-07-01"),
            },
            EpisodePatch::ClearCheckup(CheckupKind::FootExam),
        ];
        for patch in patches {
            let err = store.mutate(episode.id(), patch).unwrap_err();
            assert!(matches!(err, CareError::EpisodeArchived(_)));
        }
        assert_eq!(store.get(episode.id()).unwrap(), &before);
    }

    #[test]
    fn mutate_rejects_archived_pregnancy() {
        let mut store = EpisodeStore::new(EpisodeKind::Pregnancy, cfg());
        let episode = store
            .start_episode(RecordId::new(), pregnancy("2024-02-15", "2024-01-01"))
            .unwrap();
        store
            .archive_episode(episode.id(), date("2024-09-30"), Some("Parto eutócico".into()))
            .unwrap();

        let patches = vec![
            EpisodePatch::AddRiskFactor(RiskFactor::Anemia),
            EpisodePatch::SetObstetricHistory(ObstetricHistory::default()),
            EpisodePatch::StampVaccine {
                vaccine: VaccineKind::Tdap,
                date: date("2024-10-01"),
            },
        ];
        for patch in patches {
            assert!(store.mutate(episode.id(), patch).unwrap_err().is_state());
        }
        let stored = store.get(episode.id()).unwrap();
        assert!(stored.pregnancy().unwrap().risk_factors().is_empty());
    }

    #[test]
    fn mutate_diagnosis_changes_are_idempotent() {
        let mut store = EpisodeStore::new(EpisodeKind::Chronic, cfg());
        let episode = store
            .start_episode(RecordId::new(), chronic("2024-01-10", &["Diabetes Mellitus"]))
            .unwrap();

        store
            .mutate(episode.id(), EpisodePatch::AddDiagnosis("Diabetes Mellitus".into()))
            .unwrap();
        let updated = store
            .mutate(episode.id(), EpisodePatch::RemoveDiagnosis("Obesidad".into()))
            .unwrap();
        assert_eq!(updated.chronic().unwrap().diagnoses(), ["Diabetes Mellitus"]);
    }

    #[test]
    fn mutate_risk_factors_on_pregnancy() {
        let mut store = EpisodeStore::new(EpisodeKind::Pregnancy, cfg());
        let episode = store
            .start_episode(RecordId::new(), pregnancy("2024-02-15", "2024-01-01"))
            .unwrap();

        store
            .mutate(episode.id(), EpisodePatch::AddRiskFactor(RiskFactor::Diabetes))
            .unwrap();
        let updated = store
            .mutate(episode.id(), EpisodePatch::AddRiskFactor(RiskFactor::Diabetes))
            .unwrap();
        assert_eq!(updated.pregnancy().unwrap().risk_factors().len(), 1);
    }

    #[test]
    fn append_visit_to_pregnancy_computes_gestational_age() {
        let mut store = EpisodeStore::new(EpisodeKind::Pregnancy, cfg());
        let episode = store
            .start_episode(RecordId::new(), pregnancy("2024-02-15", "2024-01-01"))
            .unwrap();

        let encounter = store.append_visit(episode.id(), visit("2024-03-01")).unwrap();
        let ga = encounter.gestational_age().unwrap();
        assert_eq!((ga.weeks, ga.days), (8, 4));
        assert!((ga.as_decimal() - 8.571).abs() < 0.001);
    }

    #[test]
    fn final_visit_archives_pregnancy_in_the_same_change() {
        let sink = Arc::new(RecordingSink::default());
        let mut store = EpisodeStore::new(EpisodeKind::Pregnancy, cfg()).with_sink(sink.clone());
        let episode = store
            .start_episode(RecordId::new(), pregnancy("2024-02-15", "2024-01-01"))
            .unwrap();

        let mut input = visit("2024-03-01");
        input.finalizes_on = Some(date("2024-03-08"));
        input.outcome = Some("Aborto espontáneo".into());
        let encounter = store.append_visit(episode.id(), input).unwrap();
        assert_eq!(encounter.gestational_age().unwrap().total_days(), 67);

        let stored = store.get(episode.id()).unwrap();
        assert_eq!(stored.status(), EpisodeStatus::Archived);
        assert_eq!(stored.end_date(), Some(date("2024-03-08")));
        assert_eq!(stored.outcome(), Some("Aborto espontáneo"));
        assert_eq!(stored.visits().len(), 1);
        assert_eq!(sink.updates.lock().unwrap().len(), 2);

        let err = store
            .archive_episode(episode.id(), date("2024-09-30"), None)
            .unwrap_err();
        assert!(err.is_state());
        assert_eq!(
            store.get(episode.id()).unwrap().end_date(),
            Some(date("2024-03-08"))
        );
    }

    #[test]
    fn final_visit_with_earlier_end_date_is_rejected() {
        let mut store = EpisodeStore::new(EpisodeKind::Pregnancy, cfg());
        let episode = store
            .start_episode(RecordId::new(), pregnancy("2024-02-15", "2024-01-01"))
            .unwrap();

        let mut input = visit("2024-03-01");
        input.finalizes_on = Some(date("2023-11-01"));
        let err = store.append_visit(episode.id(), input).unwrap_err();
        assert!(err.is_validation());

        let stored = store.get(episode.id()).unwrap();
        assert!(stored.is_active());
        assert!(stored.visits().is_empty());
        assert_eq!(stored.end_date(), None);
    }

    #[test]
    fn append_visit_rejects_date_before_episode_start() {
        let mut store = EpisodeStore::new(EpisodeKind::Chronic, cfg());
        let episode = store
            .start_episode(RecordId::new(), chronic("2024-01-10", &["Diabetes Mellitus"]))
            .unwrap();

        let err = store.append_visit(episode.id(), visit("2020-05-01")).unwrap_err();
        assert!(err.is_validation());
        assert!(store.get(episode.id()).unwrap().visits().is_empty());
    }

    #[test]
    fn append_visit_captures_treatment_snapshot_by_value() {
        let mut store = EpisodeStore::new(EpisodeKind::Chronic, cfg());
        let episode = store
            .start_episode(RecordId::new(), chronic("2024-01-10", &["Diabetes Mellitus"]))
            .unwrap();
        let updated = store
            .mutate(
                episode.id(),
                EpisodePatch::AddMedication(NewMedication {
                    drug: "Metformina".into(),
                    dose: "850mg".into(),
                    frequency: "c/12h".into(),
                    active: true,
                }),
            )
            .unwrap();
        let medication_id = updated.chronic().unwrap().current_medications()[0].id;

        let first = store.append_visit(episode.id(), visit("2024-02-01")).unwrap();
        assert_eq!(first.treatment_snapshot(), Some("Metformina 850mg c/12h"));

        store
            .mutate(
                episode.id(),
                EpisodePatch::SetMedicationActive {
                    medication_id,
                    active: false,
                },
            )
            .unwrap();
        let second = store.append_visit(episode.id(), visit("2024-03-01")).unwrap();
        assert_eq!(second.treatment_snapshot(), Some("Sin medicación activa"));

        let stored = store.get(episode.id()).unwrap();
        assert_eq!(
            stored.visits_chronological()[0].treatment_snapshot(),
            Some("Metformina 850mg c/12h")
        );
    }

    #[test]
    fn append_visit_stamps_checkups_with_visit_date() {
        let mut store = EpisodeStore::new(EpisodeKind::Chronic, cfg());
        let episode = store
            .start_episode(RecordId::new(), chronic("2024-01-10", &["Diabetes Mellitus"]))
            .unwrap();

        let mut input = visit("2024-04-02");
        input.checkups_performed = vec![CheckupKind::FootExam, CheckupKind::FootExam];
        let encounter = store.append_visit(episode.id(), input).unwrap();
        assert_eq!(encounter.checkups_performed(), [CheckupKind::FootExam]);

        let stored = store.get(episode.id()).unwrap();
        assert_eq!(
            stored
                .chronic()
                .unwrap()
                .annual_checkups()
                .get(CheckupKind::FootExam),
            Some(date("2024-04-02"))
        );
    }

    #[test]
    fn failed_append_leaves_episode_untouched() {
        let mut store = EpisodeStore::new(EpisodeKind::Chronic, cfg());
        let episode = store
            .start_episode(RecordId::new(), chronic("2024-01-10", &["Diabetes Mellitus"]))
            .unwrap();

        let mut input = visit("2024-04-02");
        input.checkups_performed = vec![CheckupKind::Fundoscopy];
        input.weight_kg = None;
        let err = store.append_visit(episode.id(), input).unwrap_err();
        assert!(matches!(err, CareError::MissingMeasurement("weight")));

        let stored = store.get(episode.id()).unwrap();
        assert!(stored.visits().is_empty());
        assert_eq!(
            stored
                .chronic()
                .unwrap()
                .annual_checkups()
                .get(CheckupKind::Fundoscopy),
            None
        );
    }

    #[test]
    fn append_visit_requires_blood_pressure() {
        let mut store = EpisodeStore::new(EpisodeKind::Chronic, cfg());
        let episode = store
            .start_episode(RecordId::new(), chronic("2024-01-10", &["Diabetes Mellitus"]))
            .unwrap();

        let mut input = visit("2024-04-02");
        input.blood_pressure = Some("  ".into());
        let err = store.append_visit(episode.id(), input).unwrap_err();
        assert!(matches!(err, CareError::MissingMeasurement("blood pressure")));

        let mut input = visit("2024-04-02");
        input.blood_pressure = Some("ciento veinte".into());
        assert!(store.append_visit(episode.id(), input).unwrap_err().is_validation());
    }

    #[test]
    fn append_visit_rejects_archived_episode() {
        let mut store = EpisodeStore::new(EpisodeKind::Chronic, cfg());
        let episode = store
            .start_episode(RecordId::new(), chronic("2024-01-10", &["Diabetes Mellitus"]))
            .unwrap();
        store
            .archive_episode(episode.id(), date("2024-06-01"), None)
            .unwrap();

        let err = store.append_visit(episode.id(), visit("2024-06-02")).unwrap_err();
        assert!(matches!(err, CareError::EpisodeArchived(_)));
    }

    #[test]
    fn visits_are_read_in_date_order_regardless_of_append_order() {
        let mut store = EpisodeStore::new(EpisodeKind::Chronic, cfg());
        let episode = store
            .start_episode(RecordId::new(), chronic("2024-01-10", &["Diabetes Mellitus"]))
            .unwrap();

        store.append_visit(episode.id(), visit("2024-05-01")).unwrap();
        store.append_visit(episode.id(), visit("2024-02-01")).unwrap();
        store.append_visit(episode.id(), visit("2024-03-15")).unwrap();

        let stored = store.get(episode.id()).unwrap();
        let dates: Vec<_> = stored
            .visits_newest_first()
            .iter()
            .map(|v| v.date())
            .collect();
        assert_eq!(
            dates,
            vec![date("2024-05-01"), date("2024-03-15"), date("2024-02-01")]
        );
        assert_eq!(stored.latest_visit().unwrap().date(), date("2024-05-01"));
    }

    #[test]
    fn sink_is_notified_after_each_commit_only() {
        let sink = Arc::new(RecordingSink::default());
        let mut store = EpisodeStore::new(EpisodeKind::Chronic, cfg()).with_sink(sink.clone());
        let patient = RecordId::new();

        let episode = store
            .start_episode(patient, chronic("2024-01-10", &["Diabetes Mellitus"]))
            .unwrap();
        store.append_visit(episode.id(), visit("2024-02-01")).unwrap();
        let _ = store.start_episode(patient, chronic("2024-01-10", &["Diabetes Mellitus"]));
        let mut bad = visit("2024-02-01");
        bad.weight_kg = None;
        let _ = store.append_visit(episode.id(), bad);

        let updates = sink.updates.lock().unwrap();
        assert_eq!(updates.len(), 2);
        assert!(updates.iter().all(|(id, count)| *id == patient && *count == 1));
    }

    #[test]
    fn from_episodes_rejects_two_active_episodes_for_a_patient() {
        let mut store = EpisodeStore::new(EpisodeKind::Chronic, cfg());
        let a = store
            .start_episode(RecordId::new(), chronic("2024-01-10", &["Diabetes Mellitus"]))
            .unwrap();
        let b = CareEpisode::start(a.patient_id(), chronic("2024-02-10", &["Dislipidemia"]))
            .unwrap();

        let err = EpisodeStore::from_episodes(EpisodeKind::Chronic, cfg(), vec![a.clone(), b])
            .unwrap_err();
        assert!(err.is_state());

        let restored = EpisodeStore::from_episodes(EpisodeKind::Chronic, cfg(), vec![a.clone()])
            .unwrap();
        assert_eq!(restored.get(a.id()), Some(&a));
    }
}
