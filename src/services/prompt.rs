//! 提示词生成 - 业务能力层
//!
//! 只负责把指南文本和一份病例渲染成患者版、医生版两条提示词

use serde::Serialize;

use crate::config::PromptLanguage;
use crate::guideline::GuidelineRepository;
use crate::models::patient::{format_volume, PatientCase};

const PATIENT_INSTRUCTIONS: &str = r#"You are a medical agent specializing in explaining cerebral hemorrhage-related disease conditions and treatment plans in a gentle, clear, and empathetic manner to both patients and their families.
Based on the following available data (medical history, physical examinations, laboratory test results, CT reports, and segmentation results), you must strictly reference the "2022 Guideline for the Management of Patients With Spontaneous Intracerebral Hemorrhage" from the American Heart Association/American Stroke Association, as well as findings from major clinical trials including ENRICH, INTERACT3, SWITCH, and ANNEXA-I, to provide a synchronized communication and explanation to both the patient and their family.
Specific Requirements:
1. Start by addressing the patient directly, using simple, warm language to briefly explain what has happened and the main direction of treatment, helping the patient understand and feel reassured.
2. Then, address the family members, providing a more detailed explanation of the need for further examinations, the rationale behind treatment choices, potential risks, and rehabilitation expectations, so that the family can better support decision-making.
3. Throughout the communication, use language that is easy for non-medical individuals to understand; if medical terms must be used, provide a brief and clear explanation.
4. Maintain a tone that is scientific, authoritative, and positively encouraging.
5. Base all explanations strictly on the available data; do not fabricate or assume information. If uncertainties exist, state them transparently.
6. Avoid using absolute expressions such as "100%" or "definitely"; instead, prefer phrasing like "likely," "tends to," or "based on current evidence."
Suggested Output Structure:
1. Communication paragraph directed toward the patient
2. Supplementary explanation paragraph directed toward the family
3. Summary and encouragement paragraph"#;

const DOCTOR_INSTRUCTIONS: &str = r#"As a medical agent specializing in the diagnosis and treatment of cerebral hemorrhage, your task is to provide precise, evidence-based recommendations using only the available data: medical history, physical examinations, laboratory tests, CT reports, and CT segmentation results. No additional clinical information will be accessible.
When formulating treatment strategies, strictly reference the "2022 Guideline for the Management of Patients With Spontaneous Intracerebral Hemorrhage" from the American Heart Association/American Stroke Association, as well as findings from major clinical trials including ENRICH, INTERACT3, SWITCH, and ANNEXA-I.
Request for Recommendations:
1. Additional Testing Recommendations:
Identify any further diagnostic tests that are necessary for a comprehensive assessment of the patient's condition.
2. Treatment Recommendations:
Provide preliminary treatment suggestions — including pharmacological management, surgical intervention, or other measures — tailored to the patient's specific circumstances, and in strict accordance with the referenced guidelines and clinical trial data.
Additional Requirements:
1. All recommendations must rigorously adhere to the specified guideline and trial evidence.
2. Individual patient differences must be carefully considered to ensure that the recommendations are personalized and adaptable.
3. The recommendations should aim to optimize diagnostic efficiency and therapeutic outcomes.
4. It is critical to validate all available data during the management process. If patient data significantly deviate from guideline standards — for example, a hematoma volume exceeding the specified 30–80 mL range (e.g., 80 mL) — avoid uncritical application of guideline-based classifications. Conduct a critical appraisal before making recommendations.
5. Clearly indicate the source of each recommendation, specifying whether it is based on a particular guideline or a clinical trial result."#;

const PATIENT_INTRO: &str = "The patient's available information is as follows:";
const DOCTOR_INTRO: &str = "The available information for the patient is as follows:";

/// 一份病例对应的两条提示词
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptPair {
    pub patient_prompt: String,
    pub doctor_prompt: String,
}

/// 提示词生成器
///
/// 职责：
/// - 持有指南与临床试验文本
/// - 按标签语言渲染病例字段
/// - 不关心 LLM 调用与结果落盘
#[derive(Debug, Clone)]
pub struct PromptGenerator {
    guideline_title: String,
    guideline: String,
    clinical_trials_title: String,
    clinical_trials: String,
    language: PromptLanguage,
}

impl PromptGenerator {
    pub fn new(repo: &GuidelineRepository, language: PromptLanguage) -> Self {
        Self {
            guideline_title: repo.guideline().title.clone(),
            guideline: repo.guideline().body.trim().to_string(),
            clinical_trials_title: repo.clinical_trials().title.clone(),
            clinical_trials: repo.clinical_trials().body.trim().to_string(),
            language,
        }
    }

    /// 面向患者及家属的提示词
    pub fn patient_prompt(&self, case: &PatientCase) -> String {
        self.render(PATIENT_INSTRUCTIONS, PATIENT_INTRO, case)
    }

    /// 面向医生的提示词
    pub fn doctor_prompt(&self, case: &PatientCase) -> String {
        self.render(DOCTOR_INSTRUCTIONS, DOCTOR_INTRO, case)
    }

    pub fn generate(&self, case: &PatientCase) -> PromptPair {
        PromptPair {
            patient_prompt: self.patient_prompt(case),
            doctor_prompt: self.doctor_prompt(case),
        }
    }

    fn render(&self, instructions: &str, intro: &str, case: &PatientCase) -> String {
        format!(
            "{instructions}\n\n{}\n{}\n\n{}:\n{}\n\n{intro}\n{}\n",
            self.guideline_title,
            self.guideline,
            self.clinical_trials_title,
            self.clinical_trials,
            self.case_section(case),
        )
    }

    fn case_section(&self, case: &PatientCase) -> String {
        let (vol1, vol2, vol3) = (
            format_volume(case.vol1),
            format_volume(case.vol2),
            format_volume(case.vol3),
        );
        match self.language {
            PromptLanguage::En => format!(
                "Imaging findings: {}\n\
                 Impression: {}\n\
                 Medical history: {}\n\
                 Laboratory Tests: {}\n\
                 \n\
                 CT Image Segmentation Results of Cerebral Hemorrhage:\n\
                 Intraparenchymal hemorrhage: {vol1}\n\
                 Intraventricular hemorrhage: {vol2}\n\
                 Perihematomal edema: {vol3}",
                case.inspection, case.diagnosis, case.case_history, case.examination,
            ),
            PromptLanguage::Zh => format!(
                "检查所见：{}\n\n诊断结论：{}\n\n病历：{}\n\n检验：{}\n\n\
                 脑出血CT影像分割结果：脑实质出血{vol1}，脑室积血{vol2}，血肿周围水肿{vol3}。",
                case.inspection, case.diagnosis, case.case_history, case.examination,
            ),
        }
    }
}
