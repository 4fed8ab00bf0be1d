//! Input controls for simulating a candidate on the prediction view.

use crate::predictor::CandidateProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Age,
    Internship,
    Prepared,
    Training,
    Contacts,
    Freelance,
    Feedback,
    ExtraCourses,
}

impl Control {
    pub const ALL: [Control; 8] = [
        Control::Age,
        Control::Internship,
        Control::Prepared,
        Control::Training,
        Control::Contacts,
        Control::Freelance,
        Control::Feedback,
        Control::ExtraCourses,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Control::Age => "Age",
            Control::Internship => "Has internship experience?",
            Control::Prepared => "Felt prepared?",
            Control::Training => "Took part in training programs?",
            Control::Contacts => "Professional contacts made",
            Control::Freelance => "Freelance jobs done",
            Control::Feedback => "Feedback received",
            Control::ExtraCourses => "Has extra courses?",
        }
    }

    /// Inclusive slider bounds; yes/no controls use `0..=1`.
    pub fn bounds(&self) -> (u32, u32) {
        match self {
            Control::Age => (18, 60),
            Control::Contacts => (0, 50),
            Control::Freelance | Control::Feedback => (0, 20),
            Control::Internship | Control::Prepared | Control::Training | Control::ExtraCourses => {
                (0, 1)
            }
        }
    }

    pub fn is_yes_no(&self) -> bool {
        self.bounds() == (0, 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationForm {
    values: [u32; 8],
    selected: usize,
}

impl Default for SimulationForm {
    fn default() -> Self {
        // Age 25, every yes/no on "yes", contacts 5, freelance 2, feedback 3.
        Self {
            values: [25, 1, 1, 1, 5, 2, 3, 1],
            selected: 0,
        }
    }
}

impl SimulationForm {
    pub fn selected(&self) -> Control {
        Control::ALL[self.selected]
    }

    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1) % Control::ALL.len();
    }

    pub fn select_previous(&mut self) {
        self.selected = (self.selected + Control::ALL.len() - 1) % Control::ALL.len();
    }

    pub fn value(&self, control: Control) -> u32 {
        self.values[control as usize]
    }

    pub fn set(&mut self, control: Control, value: u32) {
        let (low, high) = control.bounds();
        self.values[control as usize] = value.clamp(low, high);
    }

    /// Raises the selected control; yes/no controls toggle.
    pub fn increase(&mut self) {
        let control = self.selected();
        let value = self.value(control);
        if control.is_yes_no() {
            self.set(control, 1 - value);
        } else {
            self.set(control, value.saturating_add(1));
        }
    }

    /// Lowers the selected control; yes/no controls toggle.
    pub fn decrease(&mut self) {
        let control = self.selected();
        let value = self.value(control);
        if control.is_yes_no() {
            self.set(control, 1 - value);
        } else {
            self.set(control, value.saturating_sub(1));
        }
    }

    pub fn display_value(&self, control: Control) -> String {
        let value = self.value(control);
        if control.is_yes_no() {
            let answer = if value == 1 { "Yes" } else { "No" };
            answer.to_string()
        } else {
            value.to_string()
        }
    }

    pub fn to_profile(&self) -> CandidateProfile {
        let flag = |c: Control| self.value(c) as u8;
        CandidateProfile {
            age: self.value(Control::Age),
            has_internship_experience: flag(Control::Internship),
            felt_prepared: flag(Control::Prepared),
            completed_training_program: flag(Control::Training),
            professional_contacts: self.value(Control::Contacts),
            freelance_jobs: self.value(Control::Freelance),
            feedback_received: self.value(Control::Feedback),
            has_extra_courses: flag(Control::ExtraCourses),
        }
    }
}
