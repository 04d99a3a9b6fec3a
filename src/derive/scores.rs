use crate::products::model::{Grade, NovaGroup};

const ORGANIC_POINTS: u32 = 30;
const ECO_POINTS: u32 = 20;
const SUSTAINABLE_POINTS: u32 = 20;
const LOW_PROCESSING_POINTS: u32 = 30;

const GOOD_GRADE_POINTS: u32 = 40;
const NO_ALLERGEN_POINTS: u32 = 30;

const MAX_SCORE: u32 = 100;

pub(crate) fn any_label_contains(labels: &[String], needle: &str) -> bool {
    labels.iter().any(|l| l.to_lowercase().contains(needle))
}

pub fn green_score(labels: &[String], nova: NovaGroup) -> u8 {
    let mut score = 0;
    if any_label_contains(labels, "organic") {
        score += ORGANIC_POINTS;
    }
    if any_label_contains(labels, "eco") {
        score += ECO_POINTS;
    }
    if any_label_contains(labels, "sustainable") {
        score += SUSTAINABLE_POINTS;
    }
    if nova.is_low_processing() {
        score += LOW_PROCESSING_POINTS;
    }
    score.min(MAX_SCORE) as u8
}

pub fn match_score(grade: Option<Grade>, allergens: &[String], nova: NovaGroup) -> u8 {
    let mut score = 0;
    if grade.is_some_and(Grade::is_good) {
        score += GOOD_GRADE_POINTS;
    }
    if allergens.is_empty() {
        score += NO_ALLERGEN_POINTS;
    }
    if nova.is_low_processing() {
        score += LOW_PROCESSING_POINTS;
    }
    score.min(MAX_SCORE) as u8
}

#[cfg(test)]
mod score_tests {
    use super::*;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn green_score_adds_fixed_increment_per_keyword() {
        let nova = NovaGroup::Four;
        assert_eq!(green_score(&[], nova), 0);
        assert_eq!(green_score(&labels(&["EU ORGANIC"]), nova), 30);
        assert_eq!(green_score(&labels(&["Eco-Label"]), nova), 20);
        assert_eq!(green_score(&labels(&["Sustainable Fishing"]), nova), 20);
        assert_eq!(green_score(&labels(&["Organic", "sustainable"]), nova), 50);
    }

    #[test]
    fn green_score_never_exceeds_one_hundred() {
        let all = labels(&["organic", "eco", "sustainable"]);
        assert_eq!(green_score(&all, NovaGroup::Three), 70);
        assert_eq!(green_score(&all, NovaGroup::One), 100);
        // "organic" and "eco" in one label still count separately
        assert_eq!(green_score(&labels(&["organic ecological sustainable"]), NovaGroup::Two), 100);
    }

    #[test]
    fn match_score_is_full_for_ideal_product() {
        for grade in [Grade::A, Grade::B] {
            for nova in [NovaGroup::One, NovaGroup::Two] {
                assert_eq!(match_score(Some(grade), &[], nova), 100);
            }
        }
    }

    #[test]
    fn match_score_components() {
        let milk = labels(&["en:milk"]);
        assert_eq!(match_score(Some(Grade::C), &milk, NovaGroup::Four), 0);
        assert_eq!(match_score(Some(Grade::A), &milk, NovaGroup::Four), 40);
        assert_eq!(match_score(None, &[], NovaGroup::Four), 30);
        assert_eq!(match_score(Some(Grade::E), &milk, NovaGroup::Two), 30);
    }

    #[test]
    fn unknown_nova_gets_no_processing_bonus() {
        assert_eq!(green_score(&[], NovaGroup::Unknown), 0);
        assert_eq!(match_score(None, &labels(&["gluten"]), NovaGroup::Unknown), 0);
        assert_eq!(green_score(&[], NovaGroup::Three), green_score(&[], NovaGroup::Unknown));
    }
}
