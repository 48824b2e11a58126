//! Canonical test catalog — the fixed vocabulary of lab tests the
//! extraction engine can recognize.
//!
//! Each canonical test carries its surface-form synonyms (English
//! abbreviations, full names, Arabic names), the customary unit, and a
//! printable normal range. The catalog is an immutable value built once at
//! startup and passed by reference into extraction calls; nothing mutates
//! it after load.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One canonical lab test with its known surface forms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalTest {
    /// Canonical identifier, e.g. "Glucose" or "WBC".
    pub id: String,
    /// Ordered surface forms; matching is case-insensitive substring.
    pub synonyms: Vec<String>,
    /// Customary unit, used when a report prints no unit of its own.
    pub unit: Option<String>,
    /// Printable normal range. Free-form: some ranges are sex-dependent
    /// or "Varies by component" and cannot be parsed into low/high.
    pub normal_range: Option<String>,
}

/// Immutable catalog of canonical tests, keyed by canonical id.
#[derive(Debug, Clone)]
pub struct Catalog {
    tests: Vec<CanonicalTest>,
    by_id: HashMap<String, usize>,
}

impl Catalog {
    pub fn new(tests: Vec<CanonicalTest>) -> Self {
        let by_id = tests
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();
        Self { tests, by_id }
    }

    /// Look up a test by its canonical id.
    pub fn lookup(&self, canonical_id: &str) -> Option<&CanonicalTest> {
        self.by_id.get(canonical_id).map(|&i| &self.tests[i])
    }

    pub fn tests(&self) -> &[CanonicalTest] {
        &self.tests
    }

    /// Every (canonical id, lowercased synonym) pair, in catalog order.
    pub fn all_synonyms_lowercased(&self) -> impl Iterator<Item = (&str, String)> {
        self.tests.iter().flat_map(|t| {
            t.synonyms
                .iter()
                .map(move |s| (t.id.as_str(), s.to_lowercase()))
        })
    }

    /// Resolve a numeric value out of extracted results by exact synonym
    /// match (case- and whitespace-insensitive). Used by downstream
    /// consumers that need one biomarker out of a stored result set.
    pub fn biomarker_value(
        &self,
        canonical_id: &str,
        results: &[crate::models::ExtractedResult],
    ) -> Option<f64> {
        let test = self.lookup(canonical_id)?;
        for result in results {
            let item = result.item.trim().to_lowercase();
            if test.synonyms.iter().any(|s| s.trim().to_lowercase() == item) {
                return result.value.trim().parse().ok();
            }
        }
        None
    }

    /// The full built-in catalog: CBC panel, liver and kidney function,
    /// diabetes, lipid profile, thyroid, electrolytes, inflammation
    /// markers, urinalysis.
    pub fn builtin() -> Self {
        fn t(
            id: &str,
            synonyms: &[&str],
            unit: Option<&str>,
            normal_range: Option<&str>,
        ) -> CanonicalTest {
            CanonicalTest {
                id: id.to_string(),
                synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
                unit: unit.map(str::to_string),
                normal_range: normal_range.map(str::to_string),
            }
        }

        Catalog::new(vec![
            // Complete Blood Count
            t(
                "CBC",
                &["CBC", "Complete Blood Count", "صورة دم كاملة", "تعداد الدم الكامل"],
                None,
                Some("Varies by component"),
            ),
            t(
                "WBC",
                &["WBC", "White Blood Cells", "Leukocytes", "كريات الدم البيضاء"],
                Some("cells/μL"),
                Some("4,500-11,000 cells/μL"),
            ),
            t(
                "RBC",
                &["RBC", "Red Blood Cells", "Erythrocytes", "كريات الدم الحمراء"],
                Some("million/μL"),
                Some("Male: 4.7-6.1 million/μL\nFemale: 4.2-5.4 million/μL"),
            ),
            t(
                "Hemoglobin",
                &["Hemoglobin", "Hb", "HGB", "هيموجلوبين"],
                Some("g/dL"),
                Some("Male: 13.5-17.5 g/dL\nFemale: 12.0-15.5 g/dL"),
            ),
            t(
                "Hematocrit",
                &["Hematocrit", "HCT", "PCV", "هماتوكريت"],
                Some("%"),
                Some("Male: 38.8%-50.0%\nFemale: 34.9%-44.5%"),
            ),
            t(
                "Platelets",
                &["Platelets", "PLT", "Thrombocytes", "الصفائح الدموية"],
                Some("/μL"),
                Some("150,000-450,000/μL"),
            ),
            // Liver function
            t(
                "ALT",
                &["ALT", "SGPT", "Alanine Aminotransferase", "إنزيم الكبد"],
                Some("U/L"),
                Some("7-55 U/L"),
            ),
            t(
                "AST",
                &["AST", "SGOT", "Aspartate Aminotransferase"],
                Some("U/L"),
                Some("8-48 U/L"),
            ),
            t(
                "ALP",
                &["ALP", "Alkaline Phosphatase", "الفوسفاتاز القلوي"],
                Some("U/L"),
                Some("45-115 U/L"),
            ),
            t(
                "Bilirubin",
                &["Bilirubin", "Total Bilirubin", "بيليروبين"],
                Some("mg/dL"),
                Some("0.1-1.2 mg/dL"),
            ),
            // Kidney function
            t(
                "Creatinine",
                &["Creatinine", "Cr", "كرياتينين"],
                Some("mg/dL"),
                Some("Male: 0.74-1.35 mg/dL\nFemale: 0.59-1.04 mg/dL"),
            ),
            t(
                "Urea",
                &["Urea", "BUN", "Blood Urea Nitrogen", "يوريا"],
                Some("mg/dL"),
                Some("7-20 mg/dL"),
            ),
            // Diabetes
            t(
                "Glucose",
                &["Glucose", "Blood Glucose", "FBS", "FBG", "سكر الدم"],
                Some("mg/dL"),
                Some("Fasting: 70-99 mg/dL\nPostprandial: <140 mg/dL"),
            ),
            t(
                "HbA1c",
                &["HbA1c", "A1C", "Glycated Hemoglobin", "الهيموجلوبين السكري"],
                Some("%"),
                Some("<5.7%"),
            ),
            // Lipid profile
            t(
                "Cholesterol",
                &["Cholesterol", "Total Cholesterol", "TC", "كوليسترول"],
                Some("mg/dL"),
                Some("<200 mg/dL"),
            ),
            t(
                "Triglycerides",
                &["Triglycerides", "TAG", "TG", "الدهون الثلاثية"],
                Some("mg/dL"),
                Some("<150 mg/dL"),
            ),
            t(
                "HDL",
                &["HDL", "High-Density Lipoprotein", "بروتين دهني عالي الكثافة"],
                Some("mg/dL"),
                Some(">40 mg/dL (Male)\n>50 mg/dL (Female)"),
            ),
            t(
                "LDL",
                &["LDL", "Low-Density Lipoprotein", "بروتين دهني منخفض الكثافة"],
                Some("mg/dL"),
                Some("<100 mg/dL (Optimal)"),
            ),
            // Thyroid
            t(
                "TSH",
                &["TSH", "Thyroid Stimulating Hormone", "هرمون الغدة الدرقية"],
                Some("mIU/L"),
                Some("0.4-4.0 mIU/L"),
            ),
            t(
                "T3",
                &["T3", "Triiodothyronine"],
                Some("ng/dL"),
                Some("100-200 ng/dL"),
            ),
            t(
                "T4",
                &["T4", "Thyroxine", "ثيروكسين"],
                Some("μg/dL"),
                Some("5.0-12.0 μg/dL"),
            ),
            // Electrolytes
            t(
                "Sodium",
                &["Sodium", "Na", "Na+", "صوديوم"],
                Some("mEq/L"),
                Some("135-145 mEq/L"),
            ),
            t(
                "Potassium",
                &["Potassium", "K", "K+", "بوتاسيوم"],
                Some("mEq/L"),
                Some("3.5-5.0 mEq/L"),
            ),
            t(
                "Calcium",
                &["Calcium", "Ca", "كالسيوم"],
                Some("mg/dL"),
                Some("8.5-10.2 mg/dL"),
            ),
            // Inflammation and others
            t(
                "CRP",
                &["CRP", "C-Reactive Protein", "بروتين سي التفاعلي"],
                Some("mg/L"),
                Some("<1.0 mg/L (Low risk)"),
            ),
            t(
                "ESR",
                &["ESR", "Erythrocyte Sedimentation Rate", "سرعة الترسيب"],
                Some("mm/hr"),
                Some("Male: 0-15 mm/hr\nFemale: 0-20 mm/hr"),
            ),
            t(
                "Urine Analysis",
                &["Urine Analysis", "Urinalysis", "تحليل البول"],
                None,
                Some("Varies by parameter"),
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtractedResult;

    #[test]
    fn lookup_finds_builtin_tests() {
        let catalog = Catalog::builtin();
        let glucose = catalog.lookup("Glucose").expect("Glucose in catalog");
        assert!(glucose.synonyms.iter().any(|s| s == "FBS"));
        assert_eq!(glucose.unit.as_deref(), Some("mg/dL"));
        assert!(catalog.lookup("NotATest").is_none());
    }

    #[test]
    fn synonyms_are_lowercased_and_keep_canonical_id() {
        let catalog = Catalog::builtin();
        let pairs: Vec<_> = catalog.all_synonyms_lowercased().collect();
        assert!(pairs.contains(&("Hemoglobin", "hgb".to_string())));
        assert!(pairs.contains(&("Glucose", "سكر الدم".to_string())));
    }

    #[test]
    fn biomarker_value_resolves_via_synonym() {
        let catalog = Catalog::builtin();
        let results = vec![ExtractedResult {
            item: "FBS".into(),
            value: "105".into(),
            unit: "mg/dL".into(),
            reference_range: "70 - 99".into(),
            flag: Some(true),
        }];
        assert_eq!(catalog.biomarker_value("Glucose", &results), Some(105.0));
        assert_eq!(catalog.biomarker_value("TSH", &results), None);
    }

    #[test]
    fn biomarker_value_ignores_case_and_whitespace() {
        let catalog = Catalog::builtin();
        let results = vec![ExtractedResult {
            item: "  hemoglobin ".into(),
            value: "13.9".into(),
            unit: "g/dL".into(),
            reference_range: String::new(),
            flag: None,
        }];
        assert_eq!(catalog.biomarker_value("Hemoglobin", &results), Some(13.9));
    }
}
