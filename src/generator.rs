//! Random arithmetic question generation, parameterized by a difficulty profile.
//!
//! Generation is total: every call yields a valid question. Subtraction never goes
//! negative and division is always exact.

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use crate::config::DifficultyProfile;
use crate::domain::{Operator, Question};

pub struct QuestionGenerator {
  rng: StdRng,
  profile: DifficultyProfile,
}

impl QuestionGenerator {
  /// `seed` pins the sequence; `None` draws from OS entropy.
  pub fn new(profile: DifficultyProfile, seed: Option<u64>) -> Self {
    let rng = match seed {
      Some(s) => StdRng::seed_from_u64(s),
      None => StdRng::from_entropy(),
    };
    Self { rng, profile }
  }

  pub fn next_question(&mut self) -> Question {
    let op = self.profile.operators.choose(&mut self.rng).copied().unwrap_or(Operator::Add);
    let p = &self.profile;
    match op {
      Operator::Add => {
        let a = self.rng.gen_range(p.operand_min..=p.operand_max);
        let b = self.rng.gen_range(p.operand_min..=p.operand_max);
        Question::new(a, op, b, a + b)
      }
      Operator::Sub => {
        let a = self.rng.gen_range(p.operand_min..=p.operand_max);
        let b = self.rng.gen_range(p.operand_min..=p.operand_max);
        let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
        Question::new(hi, op, lo, hi - lo)
      }
      Operator::Mul => {
        let a = self.rng.gen_range(p.factor_min..=p.factor_max);
        let b = self.rng.gen_range(p.factor_min..=p.factor_max);
        Question::new(a, op, b, a * b)
      }
      Operator::Div => {
        let divisor = self.rng.gen_range(p.factor_min.max(1)..=p.factor_max.max(1));
        let quotient = self.rng.gen_range(p.factor_min..=p.factor_max);
        Question::new(divisor * quotient, op, divisor, quotient)
      }
    }
  }

  /// Move the generator into a closure suitable for a refill buffer.
  pub fn into_fn(mut self) -> impl FnMut() -> Question + Send + Sync {
    move || self.next_question()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(q: &Question) -> (i64, String, i64) {
    let parts: Vec<&str> = q.prompt.split(' ').collect();
    assert_eq!(parts.len(), 3, "prompt {:?}", q.prompt);
    (parts[0].parse().unwrap(), parts[1].to_string(), parts[2].parse().unwrap())
  }

  #[test]
  fn answers_match_prompts_for_every_profile() {
    for profile in [DifficultyProfile::easy(), DifficultyProfile::medium(), DifficultyProfile::hard()] {
      let mut generator = QuestionGenerator::new(profile, Some(7));
      for _ in 0..500 {
        let q = generator.next_question();
        let (a, op, b) = parse(&q);
        let expected = match op.as_str() {
          "+" => a + b,
          "-" => a - b,
          "×" => a * b,
          "÷" => {
            assert_eq!(a % b, 0, "inexact division in {:?}", q.prompt);
            a / b
          }
          other => panic!("unexpected operator {other}"),
        };
        assert_eq!(q.answer, expected, "{}", q.prompt);
        assert!(q.answer >= 0, "negative answer in {}", q.prompt);
      }
    }
  }

  #[test]
  fn easy_stays_within_operand_range() {
    let mut generator = QuestionGenerator::new(DifficultyProfile::easy(), Some(1));
    for _ in 0..200 {
      let (a, op, b) = parse(&generator.next_question());
      assert!(op == "+" || op == "-");
      assert!((1..=10).contains(&a) && (1..=10).contains(&b));
    }
  }

  #[test]
  fn same_seed_same_sequence() {
    let mut a = QuestionGenerator::new(DifficultyProfile::hard(), Some(42));
    let mut b = QuestionGenerator::new(DifficultyProfile::hard(), Some(42));
    for _ in 0..20 {
      assert_eq!(a.next_question(), b.next_question());
    }
  }
}
