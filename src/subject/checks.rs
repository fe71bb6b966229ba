//! Benchmark subjects.
//!
//! Each body reaches its capture points like the instrumented program would
//! and records, for the points it misses, how many units of slack the
//! guarding conditions lacked.

use super::{CapturePoint, Subject, Trace};

/// Slack needed to make `lhs < rhs` true.
fn lt_distance(lhs: i64, rhs: i64) -> f64 {
    if lhs < rhs {
        0.0
    } else {
        (lhs - rhs + 1) as f64
    }
}

/// Slack needed to make `lhs <= rhs` true.
fn le_distance(lhs: i64, rhs: i64) -> f64 {
    if lhs <= rhs {
        0.0
    } else {
        (lhs - rhs) as f64
    }
}

/// `check_lt(a, b)`: one goal per branch plus the exit.
pub fn less_than() -> Subject {
    Subject {
        name: "less_than",
        unit: "Checks",
        function: "check_lt",
        arity: 2,
        input_range: (-100, 100),
        points: vec![
            CapturePoint { id: "A_LT_B$a_lt_b_truebranch", line: 7 },
            CapturePoint { id: "A_LT_B$a_lt_b_falsebranch", line: 11 },
            CapturePoint { id: "A_LT_B$a_lt_b_end", line: 16 },
        ],
        body: check_lt,
    }
}

fn check_lt(args: &[i64], trace: &mut Trace) {
    let (a, b) = (args[0], args[1]);

    if a < b {
        trace.capture("A_LT_B$a_lt_b_truebranch", &[a, b]);
        trace.distance("A_LT_B$a_lt_b_falsebranch", le_distance(b, a));
    } else {
        trace.capture("A_LT_B$a_lt_b_falsebranch", &[a, b]);
        trace.distance("A_LT_B$a_lt_b_truebranch", lt_distance(a, b));
    }

    trace.capture("A_LT_B$a_lt_b_end", &[a, b]);
}

/// `check_triangle(a, b, c)`: the accepting branch and the three ways to
/// reject.
pub fn triangle() -> Subject {
    Subject {
        name: "triangle",
        unit: "TriangleCheck",
        function: "check_triangle",
        arity: 3,
        input_range: (-50, 50),
        points: vec![
            CapturePoint { id: "triangle_ok", line: 11 },
            CapturePoint { id: "triangle_not_ok_ab_ac_ok", line: 15 },
            CapturePoint { id: "triangle_not_ok_ab_ok", line: 21 },
            CapturePoint { id: "triangle_not_ok", line: 26 },
        ],
        body: check_triangle,
    }
}

fn check_triangle(args: &[i64], trace: &mut Trace) {
    let (a, b, c) = (args[0], args[1], args[2]);
    let ab = a + b;
    let ac = a + c;
    let bc = b + c;
    let values = [a, b, c, ab, ac, bc];

    if ab > c {
        if ac > b {
            if bc > a {
                trace.capture("triangle_ok", &values);
                trace.distance("triangle_not_ok_ab_ac_ok", le_distance(bc, a));
            } else {
                trace.capture("triangle_not_ok_ab_ac_ok", &values);
                trace.distance("triangle_ok", lt_distance(a, bc));
            }
            trace.distance("triangle_not_ok_ab_ok", le_distance(ac, b));
        } else {
            trace.capture("triangle_not_ok_ab_ok", &values);
            let d = lt_distance(b, ac);
            trace.distance("triangle_ok", d);
            trace.distance("triangle_not_ok_ab_ac_ok", d);
        }
        trace.distance("triangle_not_ok", le_distance(ab, c));
    } else {
        trace.capture("triangle_not_ok", &values);
        let d = lt_distance(c, ab);
        trace.distance("triangle_ok", d);
        trace.distance("triangle_not_ok_ab_ac_ok", d);
        trace.distance("triangle_not_ok_ab_ok", d);
    }
}

/// `BindExpandsVars2(cp1_off, n1, n2, MAXDATA)`: entry after the guard
/// chain, and the loop body.
pub fn bind_expands_vars2() -> Subject {
    Subject {
        name: "bind_expands_vars2",
        unit: "Checks",
        function: "BindExpandsVars2",
        arity: 4,
        input_range: (-20, 40),
        points: vec![
            CapturePoint { id: "BindExpandsVars2$funcstart", line: 40 },
            CapturePoint { id: "BindExpandsVars2$loopinvariant", line: 45 },
        ],
        body: bind_expands_vars2_body,
    }
}

fn bind_expands_vars2_body(args: &[i64], trace: &mut Trace) {
    let (cp1_off, n1, n2, max_data) = (args[0], args[1], args[2], args[3]);

    // Slack of every early return, summed.
    let guard = le_distance(0, max_data)
        + le_distance(0, n1)
        + le_distance(0, n2)
        + le_distance(0, cp1_off)
        + le_distance(n1, max_data * 2)
        + le_distance(cp1_off, n1)
        + le_distance(n2, max_data * 2 - n1);

    if guard > 0.0 {
        trace.distance("BindExpandsVars2$funcstart", guard);
        trace.distance("BindExpandsVars2$loopinvariant", guard + lt_distance(0, n2));
        return;
    }

    trace.capture("BindExpandsVars2$funcstart", &[cp1_off, n1, n2, max_data]);

    if n2 <= 0 {
        trace.distance("BindExpandsVars2$loopinvariant", lt_distance(0, n2));
    }
    for mc_i in 0..n2 {
        trace.capture("BindExpandsVars2$loopinvariant", &[mc_i, cp1_off, max_data]);
    }
}

/// `ex1(outerloop, condition, xa, ya)`: the exit of a linear loop.
pub fn ex1() -> Subject {
    Subject {
        name: "ex1",
        unit: "Ex1",
        function: "ex1",
        arity: 4,
        input_range: (-10, 10),
        points: vec![CapturePoint { id: "exitmethod", line: 24 }],
        body: ex1_body,
    }
}

fn ex1_body(args: &[i64], trace: &mut Trace) {
    let (mut outerloop, condition, mut xa, mut ya) = (args[0], args[1], args[2], args[3]);

    while outerloop > 0 {
        let x = xa.wrapping_add(ya.wrapping_mul(2)).wrapping_add(1);
        let mut y = ya.wrapping_sub(xa.wrapping_mul(2));

        if condition > 0 {
            y = y.wrapping_add(x);
        } else {
            y = y.wrapping_sub(x);
        }

        xa = x.wrapping_sub(y.wrapping_mul(2));
        ya = x.wrapping_mul(2).wrapping_add(y);

        outerloop -= 1;
    }

    trace.capture("exitmethod", &[xa, ya]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_less_than_branches() {
        let subject = less_than();

        let trace = subject.run(&[1, 2]);
        assert_eq!(trace.first_capture("A_LT_B$a_lt_b_truebranch"), Some(&[1, 2][..]));
        assert!(trace.hit("A_LT_B$a_lt_b_end"));
        assert_eq!(trace.best_distance("A_LT_B$a_lt_b_falsebranch"), Some(1.0));

        let trace = subject.run(&[5, 2]);
        assert!(trace.hit("A_LT_B$a_lt_b_falsebranch"));
        assert_eq!(trace.best_distance("A_LT_B$a_lt_b_truebranch"), Some(4.0));
    }

    #[test]
    fn test_triangle_branches() {
        let subject = triangle();

        let trace = subject.run(&[3, 4, 5]);
        assert_eq!(trace.first_capture("triangle_ok"), Some(&[3, 4, 5, 7, 8, 9][..]));

        // ab <= c
        assert!(subject.run(&[1, 1, 5]).hit("triangle_not_ok"));
        // ab > c, ac <= b
        assert!(subject.run(&[1, 5, 1]).hit("triangle_not_ok_ab_ok"));
        // ab > c, ac > b, bc <= a
        assert!(subject.run(&[5, 1, 1]).hit("triangle_not_ok_ab_ac_ok"));

        let trace = subject.run(&[1, 1, 5]);
        assert_eq!(trace.best_distance("triangle_ok"), Some(4.0));
    }

    #[test]
    fn test_bind_expands_vars2_guards() {
        let subject = bind_expands_vars2();

        let trace = subject.run(&[-1, 2, 1, 3]);
        assert!(!trace.hit("BindExpandsVars2$funcstart"));
        assert_eq!(trace.best_distance("BindExpandsVars2$funcstart"), Some(1.0));

        let trace = subject.run(&[1, 2, 3, 3]);
        assert_eq!(
            trace.first_capture("BindExpandsVars2$funcstart"),
            Some(&[1, 2, 3, 3][..])
        );
        assert_eq!(trace.capture_count("BindExpandsVars2$loopinvariant"), 3);
        assert_eq!(
            trace.first_capture("BindExpandsVars2$loopinvariant"),
            Some(&[0, 1, 3][..])
        );

        let trace = subject.run(&[0, 0, 0, 0]);
        assert!(trace.hit("BindExpandsVars2$funcstart"));
        assert_eq!(trace.best_distance("BindExpandsVars2$loopinvariant"), Some(1.0));
    }

    #[test]
    fn test_ex1_exit() {
        let subject = ex1();

        let trace = subject.run(&[0, 1, 3, 4]);
        assert_eq!(trace.first_capture("exitmethod"), Some(&[3, 4][..]));

        // One iteration with condition > 0: x = 3 + 8 + 1 = 12, y = 4 - 6 + 12 = 10.
        let trace = subject.run(&[1, 1, 3, 4]);
        assert_eq!(trace.first_capture("exitmethod"), Some(&[12 - 20, 24 + 10][..]));
    }
}
